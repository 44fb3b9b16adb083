//! Filter chain.
//!
//! A [`Filter`] sits between the server and the router. It sees every
//! request its [`UrlPattern`] matches, may change the request, hands it on
//! through [`Next::run`], and may change the response on the way back.
//! Filters run in the order they were added:
//!
//! ```text
//! server ─▶ logger ─▶ encoding ─▶ … ─▶ router ─▶ handler
//!                                                  │
//! server ◀─ logger ◀─ encoding ◀─ … ◀──────────────┘
//! ```
//!
//! Built-in filters:
//! - [`PassThroughLogger`]: logs before and after the rest of the chain
//! - [`EncodingNormalizer`]: forces one charset on parameters and responses
//!
//! ```rust,no_run
//! use percolate::Router;
//! use percolate::middleware::{EncodingNormalizer, FilterChain, FilterConfig, PassThroughLogger};
//!
//! # fn build(router: Router) -> Result<FilterChain, percolate::Error> {
//! let chain = FilterChain::new(router)
//!     .filter(PassThroughLogger::new(), FilterConfig::new("logger"))?
//!     .filter(
//!         EncodingNormalizer::new(),
//!         FilterConfig::new("encoding").with_init_parameter("encoding", "GBK"),
//!     )?;
//! # Ok(chain)
//! # }
//! ```

mod encoding;
mod logger;
mod pattern;

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

pub use encoding::{EncodingNormalizer, Latin1Reencoded, STATIC_EXTENSIONS, is_static_resource};
pub use logger::PassThroughLogger;
pub use pattern::UrlPattern;

/// A unit interposed in the request chain.
///
/// `init` runs once when the filter joins a chain, `destroy` once when the
/// server shuts down. `handle` runs per request and must call
/// `next.run(req)` to continue the chain; not calling it short-circuits the
/// request with whatever response the filter returns.
pub trait Filter: Send + Sync + 'static {
    fn init(&mut self, _config: &FilterConfig) -> Result<(), Error> {
        Ok(())
    }

    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a>;

    fn destroy(&self) {}
}

/// Per-filter configuration: a name, the paths it applies to, and string
/// init parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FilterConfig {
    pub name: String,
    #[serde(default = "default_url_pattern")]
    pub url_pattern: String,
    #[serde(default)]
    pub init: HashMap<String, String>,
}

fn default_url_pattern() -> String {
    UrlPattern::All.to_string()
}

impl FilterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_pattern: default_url_pattern(),
            init: HashMap::new(),
        }
    }

    pub fn with_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = pattern.into();
        self
    }

    pub fn with_init_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.init.insert(key.into(), value.into());
        self
    }

    pub fn init_parameter(&self, key: &str) -> Option<&str> {
        self.init.get(key).map(String::as_str)
    }
}

struct Registered {
    name: String,
    pattern: UrlPattern,
    filter: Box<dyn Filter>,
}

/// The remainder of the chain after the current filter.
pub struct Next<'a> {
    rest: &'a [Registered],
    router: &'a Router,
}

impl<'a> Next<'a> {
    /// Runs the next filter whose pattern matches the request, or the router
    /// once no filters remain.
    pub async fn run(self, req: Request) -> Response {
        let mut rest = self.rest;
        while let Some((current, tail)) = rest.split_first() {
            if current.pattern.matches(req.path()) {
                let next = Next { rest: tail, router: self.router };
                return current.filter.handle(req, next).await;
            }
            rest = tail;
        }
        self.router.dispatch(req).await
    }
}

/// An ordered list of initialised filters in front of a [`Router`].
pub struct FilterChain {
    filters: Vec<Registered>,
    router: Router,
}

impl FilterChain {
    pub fn new(router: Router) -> Self {
        Self { filters: Vec::new(), router }
    }

    /// Initialises `filter` with `config` and appends it to the chain.
    pub fn filter(self, filter: impl Filter, config: FilterConfig) -> Result<Self, Error> {
        self.filter_boxed(Box::new(filter), config)
    }

    pub fn filter_boxed(mut self, mut filter: Box<dyn Filter>, config: FilterConfig) -> Result<Self, Error> {
        let pattern: UrlPattern = config.url_pattern.parse()?;
        filter.init(&config)?;
        info!(filter = %config.name, pattern = %pattern, "filter initialised");
        self.filters.push(Registered { name: config.name, pattern, filter });
        Ok(self)
    }

    pub fn len(&self) -> usize { self.filters.len() }
    pub fn is_empty(&self) -> bool { self.filters.is_empty() }

    /// Runs one request through every matching filter and the router.
    pub async fn handle(&self, req: Request) -> Response {
        Next { rest: &self.filters, router: &self.router }.run(req).await
    }

    /// Calls `destroy` on every filter, last added first.
    pub fn destroy(&self) {
        for registered in self.filters.iter().rev() {
            registered.filter.destroy();
            debug!(filter = %registered.name, "filter destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    struct Record {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Filter for Record {
        fn init(&mut self, config: &FilterConfig) -> Result<(), Error> {
            self.log.lock().unwrap().push(format!("init {}", config.name));
            Ok(())
        }

        fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{} before", self.tag));
                let res = next.run(req).await;
                self.log.lock().unwrap().push(format!("{} after", self.tag));
                res
            })
        }

        fn destroy(&self) {
            self.log.lock().unwrap().push(format!("destroy {}", self.tag));
        }
    }

    struct Deny;

    impl Filter for Deny {
        fn handle<'a>(&'a self, _req: Request, _next: Next<'a>) -> BoxFuture<'a> {
            Box::pin(async { Response::status(StatusCode::FORBIDDEN) })
        }
    }

    fn get(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    fn record(tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Record {
        Record { tag, log: Arc::clone(log) }
    }

    #[tokio::test]
    async fn filters_wrap_router_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = FilterChain::new(Router::new().get("/", home))
            .filter(record("a", &log), FilterConfig::new("a")).unwrap()
            .filter(record("b", &log), FilterConfig::new("b")).unwrap();

        let res = chain.handle(get("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        chain.destroy();

        assert_eq!(*log.lock().unwrap(), [
            "init a", "init b",
            "a before", "b before", "b after", "a after",
            "destroy b", "destroy a",
        ]);
    }

    #[tokio::test]
    async fn unmatched_pattern_skips_filter() {
        let chain = FilterChain::new(Router::new().get("/public/page", home))
            .filter(Deny, FilterConfig::new("deny").with_url_pattern("/admin/*")).unwrap();

        assert_eq!(chain.handle(get("/public/page")).await.status_code(), StatusCode::OK);
        assert_eq!(chain.handle(get("/admin/x")).await.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn invalid_pattern_fails_registration() {
        let err = FilterChain::new(Router::new())
            .filter(Deny, FilterConfig::new("deny").with_url_pattern("admin"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn init_parameters_are_read_back() {
        let config = FilterConfig::new("encoding").with_init_parameter("encoding", "GBK");
        assert_eq!(config.init_parameter("encoding"), Some("GBK"));
        assert_eq!(config.init_parameter("missing"), None);
        assert_eq!(config.url_pattern, "/*");
    }

    async fn home(_req: Request) -> &'static str {
        "home"
    }
}
