//! Charset normalization.
//!
//! Containers commonly decode query strings as ISO-8859-1 regardless of what
//! the page was served in, so a UTF-8 form submitted with GET arrives as
//! mojibake. [`EncodingNormalizer`] pins one charset for the whole exchange:
//!
//! - the form body is decoded in it,
//! - GET parameters are re-decoded into it ([`Latin1Reencoded`]),
//! - the response is labelled `text/html;charset=<charset>` and text bodies
//!   are encoded in it.
//!
//! Static assets are left alone.

use std::time::Instant;

use http::Method;
use tracing::{debug, info};

use crate::charset::{Charset, reencode_latin1};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::params::Parameters;
use crate::request::Request;

use super::{Filter, FilterConfig, Next};

/// Path suffixes that mark a static asset.
pub const STATIC_EXTENSIONS: [&str; 8] = [".css", ".js", ".jpg", ".png", ".gif", ".ico", ".html", ".jsp"];

/// Init parameter naming the charset.
const ENCODING_PARAM: &str = "encoding";

/// `true` when the lower-cased `path` ends with one of [`STATIC_EXTENSIONS`].
pub fn is_static_resource(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Forces a single charset on request parameters and responses.
///
/// Configured through the `encoding` init parameter; `UTF-8` when absent or
/// empty.
#[derive(Debug, Default)]
pub struct EncodingNormalizer {
    charset: Charset,
}

impl EncodingNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A normalizer already set to `charset`, for use without `init`.
    pub fn with_charset(charset: Charset) -> Self {
        Self { charset }
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }
}

impl Filter for EncodingNormalizer {
    fn init(&mut self, config: &FilterConfig) -> Result<(), Error> {
        if let Some(label) = config.init_parameter(ENCODING_PARAM).filter(|l| !l.trim().is_empty()) {
            self.charset = Charset::for_label(label)?;
        }
        info!(filter = %config.name, charset = %self.charset, "encoding normalizer initialised");
        Ok(())
    }

    fn handle<'a>(&'a self, mut req: Request, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            if is_static_resource(req.path()) {
                return next.run(req).await;
            }

            let method = req.method().clone();
            let path = req.path().to_owned();
            let started = Instant::now();
            debug!(%method, %path, charset = %self.charset, "normalizing request encoding");

            req.set_character_encoding(self.charset.clone());
            if method.as_str().eq_ignore_ascii_case(Method::GET.as_str()) {
                let charset = self.charset.clone();
                req.map_parameters(|inner| Box::new(Latin1Reencoded::new(inner, charset)));
            }

            let mut res = next.run(req).await;
            res.set_character_encoding(self.charset.clone());
            res.set_content_type(&format!("text/html;charset={}", self.charset.label()));

            debug!(%method, %path, elapsed = ?started.elapsed(), "encoding normalized");
            res
        })
    }

    fn destroy(&self) {
        info!(charset = %self.charset, "encoding normalizer destroyed");
    }
}

/// Parameter decorator that reads every value's code points back as
/// ISO-8859-1 bytes and decodes them in the target charset.
///
/// Values that cannot be re-decoded come back unchanged.
pub struct Latin1Reencoded {
    inner: Box<dyn Parameters>,
    charset: Charset,
}

impl Latin1Reencoded {
    pub fn new(inner: Box<dyn Parameters>, charset: Charset) -> Self {
        Self { inner, charset }
    }
}

impl Parameters for Latin1Reencoded {
    fn get(&self, name: &str) -> Option<String> {
        self.inner.get(name)
            .map(|value| reencode_latin1(&value, &self.charset).into_owned())
    }

    fn get_all(&self, name: &str) -> Option<Vec<String>> {
        self.inner.get_all(name).map(|values| {
            values.iter()
                .map(|value| reencode_latin1(value, &self.charset).into_owned())
                .collect()
        })
    }

    fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<(&'static str, &'static str)>);

    impl Parameters for Fixed {
        fn get(&self, name: &str) -> Option<String> {
            self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v).to_owned())
        }
        fn get_all(&self, name: &str) -> Option<Vec<String>> {
            let values: Vec<String> = self.0.iter()
                .filter(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
                .collect();
            (!values.is_empty()).then_some(values)
        }
        fn names(&self) -> Vec<String> {
            self.0.iter().map(|(k, _)| (*k).to_owned()).collect()
        }
    }

    #[test]
    fn defaults_to_utf8_without_parameter() {
        let mut filter = EncodingNormalizer::new();
        filter.init(&FilterConfig::new("encoding")).unwrap();
        assert_eq!(filter.charset().label(), "UTF-8");
    }

    #[test]
    fn empty_parameter_keeps_default() {
        let mut filter = EncodingNormalizer::new();
        filter.init(&FilterConfig::new("encoding").with_init_parameter("encoding", "")).unwrap();
        assert_eq!(filter.charset().label(), "UTF-8");
    }

    #[test]
    fn parameter_overrides_default() {
        let mut filter = EncodingNormalizer::new();
        filter.init(&FilterConfig::new("encoding").with_init_parameter("encoding", "GBK")).unwrap();
        assert_eq!(filter.charset().label(), "GBK");
    }

    #[test]
    fn unknown_charset_fails_init() {
        let mut filter = EncodingNormalizer::new();
        let err = filter
            .init(&FilterConfig::new("encoding").with_init_parameter("encoding", "nope"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCharset(_)));
    }

    #[test]
    fn utf16_fails_init() {
        let mut filter = EncodingNormalizer::new();
        let err = filter
            .init(&FilterConfig::new("encoding").with_init_parameter("encoding", "UTF-16"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(ref l) if l == "UTF-16"));
        assert_eq!(filter.charset().label(), "UTF-8");
    }

    #[test]
    fn static_resources_match_case_insensitively() {
        assert!(is_static_resource("/css/site.css"));
        assert!(is_static_resource("/IMG/LOGO.PNG"));
        assert!(is_static_resource("/index.jsp"));
        assert!(!is_static_resource("/search"));
        assert!(!is_static_resource("/api/data.json"));
    }

    #[test]
    fn reencodes_single_and_multi_values() {
        let inner = Fixed(vec![("q", "ä½\u{a0}"), ("q", "å¥½"), ("n", "plain")]);
        let params = Latin1Reencoded::new(Box::new(inner), Charset::utf8());
        assert_eq!(params.get("q").as_deref(), Some("你"));
        assert_eq!(params.get_all("q"), Some(vec!["你".to_owned(), "好".to_owned()]));
        assert_eq!(params.get("n").as_deref(), Some("plain"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.get_all("missing"), None);
    }

    #[test]
    fn values_that_cannot_be_reencoded_are_kept() {
        let inner = Fixed(vec![("wide", "你好"), ("bad", "\u{ff}\u{fe}")]);
        let params = Latin1Reencoded::new(Box::new(inner), Charset::utf8());
        assert_eq!(params.get("wide").as_deref(), Some("你好"));
        assert_eq!(params.get("bad").as_deref(), Some("\u{ff}\u{fe}"));
    }
}
