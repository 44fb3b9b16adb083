//! Request parameters: the lookup contract and the default form decoder.

use std::borrow::Cow;

use percent_encoding::percent_decode;

use crate::charset::{Charset, decode_latin1};

/// Read access to a request's named parameters.
///
/// A request owns one boxed `Parameters`; filters may replace it with a
/// decorator (see [`Request::map_parameters`](crate::Request::map_parameters))
/// that changes how values come back while keeping the same lookups.
pub trait Parameters: Send + Sync {
    /// First value for `name`.
    fn get(&self, name: &str) -> Option<String>;

    /// Every value for `name`, in submission order.
    fn get_all(&self, name: &str) -> Option<Vec<String>>;

    /// Distinct parameter names, in first-seen order.
    fn names(&self) -> Vec<String>;
}

/// Parameters parsed from the query string and an
/// `application/x-www-form-urlencoded` body.
///
/// Query-string bytes are always read as ISO-8859-1, which is what most
/// servlet containers do by default. Body bytes are read in the request's
/// character encoding, falling back to ISO-8859-1 when none was set.
/// Query values come before body values.
#[derive(Debug, Default)]
pub struct FormParameters {
    pairs: Vec<(String, String)>,
}

impl FormParameters {
    pub fn parse(query: Option<&str>, form_body: Option<&[u8]>, charset: Option<&Charset>) -> Self {
        let mut pairs = Vec::new();

        if let Some(query) = query {
            pairs.extend(decode_pairs(query.as_bytes(), |b| decode_latin1(b).into_owned()));
        }

        if let Some(body) = form_body {
            pairs.extend(decode_pairs(body, |b| match charset {
                Some(charset) => charset.decode(b).into_owned(),
                None => decode_latin1(b).into_owned(),
            }));
        }

        Self { pairs }
    }
}

impl Parameters for FormParameters {
    fn get(&self, name: &str) -> Option<String> {
        self.pairs.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn get_all(&self, name: &str) -> Option<Vec<String>> {
        let values: Vec<String> = self.pairs.iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .collect();
        (!values.is_empty()).then_some(values)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (k, _) in &self.pairs {
            if !names.contains(k) {
                names.push(k.clone());
            }
        }
        names
    }
}

/// Splits `a=1&b=2` into decoded pairs. `+` means space; a pair without `=`
/// has an empty value; empty segments are skipped.
fn decode_pairs<'a, F>(input: &'a [u8], decode: F) -> impl Iterator<Item = (String, String)> + 'a
where
    F: Fn(&[u8]) -> String + 'a,
{
    input
        .split(|&b| b == b'&')
        .filter(|segment| !segment.is_empty())
        .map(move |segment| {
            let (name, value) = match segment.iter().position(|&b| b == b'=') {
                Some(i) => (&segment[..i], &segment[i + 1..]),
                None => (segment, &[][..]),
            };
            (decode(unescape(name).as_slice()), decode(unescape(value).as_slice()))
        })
}

fn unescape(raw: &[u8]) -> Vec<u8> {
    let spaced: Cow<'_, [u8]> = if raw.contains(&b'+') {
        Cow::Owned(raw.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect())
    } else {
        Cow::Borrowed(raw)
    };
    percent_decode(&spaced).collect()
}
