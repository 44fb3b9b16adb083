//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::{HeaderMap, Method, header};
use tracing::warn;

use crate::charset::Charset;
use crate::params::{FormParameters, Parameters};

/// An incoming HTTP request with its body fully buffered.
///
/// Parameters are parsed lazily, on first lookup, using whatever character
/// encoding is set at that moment. Setting an encoding afterwards has no
/// effect on parameters, the same contract servlet containers follow.
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    route_params: HashMap<String, String>,
    character_encoding: Option<Charset>,
    parameters: OnceLock<Box<dyn Parameters>>,
}

impl Request {
    pub fn new(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            route_params: HashMap::new(),
            character_encoding: None,
            parameters: OnceLock::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.route_params.get(key).map(String::as_str)
    }

    pub(crate) fn set_route_params(&mut self, params: HashMap<String, String>) {
        self.route_params = params;
    }

    /// The charset used to decode form bodies, if one was set.
    pub fn character_encoding(&self) -> Option<&Charset> {
        self.character_encoding.as_ref()
    }

    /// Sets the charset used to decode the form body. Ignored once
    /// parameters have been read.
    pub fn set_character_encoding(&mut self, charset: Charset) {
        if self.parameters.get().is_some() {
            warn!(path = %self.path, charset = %charset, "parameters already parsed, character encoding ignored");
            return;
        }
        self.character_encoding = Some(charset);
    }

    /// First value of a query-string or form-body parameter.
    pub fn parameter(&self, name: &str) -> Option<String> {
        self.parameters().get(name)
    }

    /// Every value of a parameter, in submission order.
    pub fn parameter_values(&self, name: &str) -> Option<Vec<String>> {
        self.parameters().get_all(name)
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters().names()
    }

    /// Replaces the parameter source with a decorator built from the current
    /// one. Parses parameters first if that has not happened yet.
    pub fn map_parameters<F>(&mut self, wrap: F)
    where
        F: FnOnce(Box<dyn Parameters>) -> Box<dyn Parameters>,
    {
        let current = match self.parameters.take() {
            Some(current) => current,
            None => self.parse_parameters(),
        };
        self.parameters = OnceLock::from(wrap(current));
    }

    fn parameters(&self) -> &dyn Parameters {
        &**self.parameters.get_or_init(|| self.parse_parameters())
    }

    fn parse_parameters(&self) -> Box<dyn Parameters> {
        let form_body = self.is_form().then_some(&self.body[..]);
        Box::new(FormParameters::parse(
            self.query.as_deref(),
            form_body,
            self.character_encoding.as_ref(),
        ))
    }

    fn is_form(&self) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}
