//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A response carries its body either as raw bytes, which go out untouched,
//! or as text, which is encoded in the response's character encoding when
//! the response is written. Filters can therefore change the charset after
//! the handler has produced the body.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::charset::Charset;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Css,  // text/css
    Html, // text/html; charset=utf-8
    Json, // application/json
    Text, // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Css  => "text/css",
            Self::Html => "text/html; charset=utf-8",
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

enum Body {
    Empty,
    Bytes(Bytes),
    Text(String),
}

/// An outgoing HTTP response.
///
/// ```rust
/// use percolate::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::html("<p>hello</p>");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    character_encoding: Option<Charset>,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain`. The text is encoded at write time.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`, `text/html`. The markup is encoded at write time.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Label of the charset text bodies are encoded in, if one was set.
    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_ref().map(Charset::label)
    }

    /// Sets or replaces a header. Values that are not valid header text are
    /// dropped with a warning.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => { self.headers.insert(name, value); }
            Err(_) => warn!(header = %name, value, "invalid header value dropped"),
        }
    }

    /// Sets the charset for text bodies. An existing `Content-Type` has its
    /// `charset` parameter rewritten to match.
    pub fn set_character_encoding(&mut self, charset: Charset) {
        if let Some(current) = self.content_type() {
            let rewritten = with_charset(current, charset.label());
            self.set_header(header::CONTENT_TYPE, &rewritten);
        }
        self.character_encoding = Some(charset);
    }

    /// Sets `Content-Type`. A `charset` parameter in `value` also becomes the
    /// character encoding; without one, the current character encoding (if
    /// any) is appended.
    pub fn set_content_type(&mut self, value: &str) {
        match charset_param(value) {
            Some(label) => {
                match Charset::for_label(label) {
                    Ok(charset) => self.character_encoding = Some(charset),
                    Err(e) => warn!(error = %e, "content type names an unknown charset"),
                }
                self.set_header(header::CONTENT_TYPE, value);
            }
            None => match self.character_encoding().map(str::to_owned) {
                Some(label) => self.set_header(header::CONTENT_TYPE, &with_charset(value, &label)),
                None => self.set_header(header::CONTENT_TYPE, value),
            },
        }
    }

    /// The body as it will be written: text is encoded in the character
    /// encoding, UTF-8 when none is set.
    pub fn body(&self) -> Cow<'_, [u8]> {
        match &self.body {
            Body::Empty => Cow::Borrowed(&[][..]),
            Body::Bytes(bytes) => Cow::Borrowed(&bytes[..]),
            Body::Text(text) => match &self.character_encoding {
                Some(charset) => charset.encode(text),
                None => Cow::Borrowed(text.as_bytes()),
            },
        }
    }

    /// Converts into the `http` response hyper writes to the wire.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let body = match self.body() {
            Cow::Borrowed(bytes) => Bytes::copy_from_slice(bytes),
            Cow::Owned(bytes) => Bytes::from(bytes),
        };
        let mut res = http::Response::new(Full::new(body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Replaces (or adds) the `charset` parameter of a content type.
fn with_charset(content_type: &str, label: &str) -> String {
    let mut parts = content_type.split(';').map(str::trim);
    let mut out = parts.next().unwrap_or_default().to_owned();
    for param in parts {
        if !param.is_empty() && !is_charset_param(param) {
            out.push(';');
            out.push_str(param);
        }
    }
    out.push_str(";charset=");
    out.push_str(label);
    out
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .map(str::trim)
        .find(|p| is_charset_param(p))
        .and_then(|p| p.split_once('='))
        .map(|(_, v)| v.trim().trim_matches('"'))
}

fn is_charset_param(param: &str) -> bool {
    param.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("charset="))
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. Invalid names or values are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => { self.headers.append(name, value); }
            _ => warn!(header = name, value, "invalid header dropped"),
        }
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json.as_str(), Body::Bytes(Bytes::from(body)))
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text.as_str(), Body::Text(body.into()))
    }

    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Html.as_str(), Body::Text(body.into()))
    }

    /// Terminate with raw bytes of the given type.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), Body::Bytes(Bytes::from(body)))
    }

    pub fn no_body(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: Body::Empty,
            character_encoding: None,
        }
    }

    fn finish(mut self, content_type: &'static str, body: Body) -> Response {
        self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response {
            status: self.status,
            headers: self.headers,
            body,
            character_encoding: None,
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
