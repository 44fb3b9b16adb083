//! Charset labels and the ISO-8859-1 re-decoding used for query strings.
//!
//! Labels resolve through the WHATWG Encoding Standard via [`encoding_rs`],
//! so `"utf8"`, `"UTF-8"` and `"unicode-1-1-utf-8"` all name the same codec.
//! The label is kept exactly as configured because it is echoed back in the
//! `Content-Type` header.
//!
//! WHATWG maps the `iso-8859-1` family of labels to windows-1252. Those
//! labels get a real ISO-8859-1 codec here instead (one byte per code point,
//! U+0000..=U+00FF) through [`encoding_rs::mem`].
//!
//! Codecs that `encoding_rs` cannot encode into (UTF-16 and the
//! `replacement` pseudo-encoding) are refused: the response would otherwise
//! be labelled with one charset and written in another.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use encoding_rs::{Encoding, UTF_8};

use crate::error::Error;

/// Label used when no charset is configured.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Labels that mean ISO-8859-1 proper rather than windows-1252.
const LATIN1_LABELS: [&str; 10] = [
    "iso-8859-1", "iso8859-1", "iso88591", "iso_8859-1", "iso_8859-1:1987",
    "latin1", "l1", "iso-ir-100", "csisolatin1", "cp819",
];

/// A configured charset: the label as written plus its resolved codec.
///
/// Cloning is cheap (one `Arc` increment), so a filter can hand a copy to
/// every request it touches.
#[derive(Clone)]
pub struct Charset {
    label: Arc<str>,
    encoding: &'static Encoding,
    latin1: bool,
}

impl Charset {
    /// Resolves `label` to a codec. Surrounding whitespace is ignored for the
    /// lookup but the label is otherwise kept verbatim.
    pub fn for_label(label: &str) -> Result<Self, Error> {
        let label = label.trim();
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::UnknownCharset(label.to_owned()))?;
        if encoding.output_encoding() != encoding {
            return Err(Error::UnsupportedCharset(label.to_owned()));
        }
        let latin1 = LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label));
        Ok(Self { label: Arc::from(label), encoding, latin1 })
    }

    pub fn utf8() -> Self {
        Self { label: Arc::from(DEFAULT_CHARSET), encoding: UTF_8, latin1: false }
    }

    /// The label as configured, e.g. `"UTF-8"` or `"GBK"`.
    pub fn label(&self) -> &str { &self.label }

    /// The WHATWG codec behind the label. For ISO-8859-1 labels this is
    /// windows-1252, which this type does not use for coding.
    pub fn encoding(&self) -> &'static Encoding { self.encoding }

    pub fn is_latin1(&self) -> bool { self.latin1 }

    /// Decodes `bytes`, replacing malformed sequences with U+FFFD.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        if self.latin1 {
            return decode_latin1(bytes);
        }
        self.encoding.decode_without_bom_handling(bytes).0
    }

    /// Decodes `bytes`, or `None` if they are malformed in this charset.
    pub fn decode_strict<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        if self.latin1 {
            return Some(decode_latin1(bytes));
        }
        self.encoding.decode_without_bom_handling_and_without_replacement(bytes)
    }

    /// Encodes `text`. Unmappable characters become numeric character
    /// references, or `?` for ISO-8859-1.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        if self.latin1 {
            if encoding_rs::mem::is_str_latin1(text) {
                return encoding_rs::mem::encode_latin1_lossy(text);
            }
            return Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect(),
            );
        }
        self.encoding.encode(text).0
    }
}

impl Default for Charset {
    fn default() -> Self { Self::utf8() }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codec = if self.latin1 { "ISO-8859-1" } else { self.encoding.name() };
        f.debug_struct("Charset")
            .field("label", &self.label)
            .field("encoding", &codec)
            .finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.encoding == other.encoding && self.latin1 == other.latin1
    }
}

impl Eq for Charset {}

/// Reads raw bytes as ISO-8859-1: every byte becomes the code point of the
/// same value. Never fails.
pub fn decode_latin1(bytes: &[u8]) -> Cow<'_, str> {
    encoding_rs::mem::decode_latin1(bytes)
}

/// Undoes an ISO-8859-1 decode and reads the original bytes in `charset`.
///
/// A query string carrying UTF-8 bytes that was decoded as ISO-8859-1 comes
/// out as mojibake (`"ä½ å¥½"`); this turns it back into `"你好"`.
///
/// Returns `value` unchanged when it contains code points above U+00FF (it
/// was never ISO-8859-1 decoded) or when the bytes are malformed in
/// `charset`.
pub fn reencode_latin1<'a>(value: &'a str, charset: &Charset) -> Cow<'a, str> {
    if charset.latin1 || (value.is_ascii() && charset.encoding.is_ascii_compatible()) {
        return Cow::Borrowed(value);
    }
    if !encoding_rs::mem::is_str_latin1(value) {
        return Cow::Borrowed(value);
    }

    let bytes = encoding_rs::mem::encode_latin1_lossy(value);
    match charset.decode_strict(&bytes) {
        Some(decoded) => Cow::Owned(decoded.into_owned()),
        None => Cow::Borrowed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_utf8() {
        let charset = Charset::default();
        assert_eq!(charset.label(), "UTF-8");
        assert_eq!(charset.encoding(), UTF_8);
    }

    #[test]
    fn label_is_kept_verbatim() {
        let charset = Charset::for_label("gbk").unwrap();
        assert_eq!(charset.label(), "gbk");
        assert_eq!(charset.encoding(), encoding_rs::GBK);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = Charset::for_label("klingon-8").unwrap_err();
        assert!(matches!(err, Error::UnknownCharset(ref l) if l == "klingon-8"));
    }

    #[test]
    fn codecs_without_matching_encoder_are_rejected() {
        for label in ["UTF-16", "utf-16le", "UTF-16BE", "iso-2022-kr", "hz-gb-2312"] {
            let err = Charset::for_label(label).unwrap_err();
            assert!(matches!(err, Error::UnsupportedCharset(ref l) if l == label), "{label}");
        }
    }

    #[test]
    fn latin1_labels_use_real_latin1() {
        for label in ["ISO-8859-1", "latin1", "CP819"] {
            let charset = Charset::for_label(label).unwrap();
            assert!(charset.is_latin1(), "{label}");
            assert_eq!(charset.decode(&[0x80, 0x9F]), "\u{80}\u{9f}");
            assert_eq!(&*charset.encode("\u{80}é€"), &[0x80u8, 0xE9, b'?'][..]);
        }
        assert!(!Charset::for_label("windows-1252").unwrap().is_latin1());
    }

    #[test]
    fn latin1_target_keeps_c1_controls() {
        let latin1 = Charset::for_label("ISO-8859-1").unwrap();
        let value = decode_latin1(&[0x80, 0x9F]).into_owned();
        assert_eq!(reencode_latin1(&value, &latin1), "\u{80}\u{9f}");
    }

    #[test]
    fn reencodes_utf8_mojibake() {
        let mojibake = decode_latin1(&[0xE4, 0xBD, 0xA0, 0xE5, 0xA5, 0xBD]);
        assert_eq!(reencode_latin1(&mojibake, &Charset::utf8()), "你好");
    }

    #[test]
    fn reencodes_gbk_mojibake() {
        let gbk = Charset::for_label("GBK").unwrap();
        let mojibake = decode_latin1(&[0xC4, 0xE3, 0xBA, 0xC3]);
        assert_eq!(reencode_latin1(&mojibake, &gbk), "你好");
    }

    #[test]
    fn keeps_values_outside_latin1() {
        let value = "你好";
        assert!(matches!(reencode_latin1(value, &Charset::utf8()), Cow::Borrowed("你好")));
    }

    #[test]
    fn keeps_values_malformed_in_target() {
        // 0xFF never appears in well-formed UTF-8.
        let value = decode_latin1(&[b'a', 0xFF]).into_owned();
        assert_eq!(reencode_latin1(&value, &Charset::utf8()), value);
    }

    #[test]
    fn ascii_is_untouched() {
        assert!(matches!(reencode_latin1("plain", &Charset::utf8()), Cow::Borrowed("plain")));
    }
}
