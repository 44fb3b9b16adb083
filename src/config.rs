//! TOML configuration: listen address and the filter chain.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [[filters]]
//! name = "logger"
//!
//! [[filters]]
//! name = "encoding"
//! url_pattern = "/*"
//! [filters.init]
//! encoding = "UTF-8"
//! ```
//!
//! Filters are instantiated by name and initialised in file order.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::middleware::{EncodingNormalizer, Filter, FilterChain, FilterConfig, PassThroughLogger};
use crate::router::Router;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub filters: Vec<FilterConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_owned() }
    }
}

/// Both built-in filters on every path, logger first, charset `UTF-8`.
impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            filters: vec![FilterConfig::new("logger"), FilterConfig::new("encoding")],
        }
    }
}

impl Config {
    /// Reads and parses a TOML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Instantiates and initialises every configured filter in front of
    /// `router`.
    pub fn build_chain(&self, router: Router) -> Result<FilterChain, Error> {
        self.filters.iter().try_fold(FilterChain::new(router), |chain, config| {
            chain.filter_boxed(instantiate(&config.name)?, config.clone())
        })
    }
}

fn instantiate(name: &str) -> Result<Box<dyn Filter>, Error> {
    match name {
        "logger" => Ok(Box::new(PassThroughLogger::new())),
        "encoding" => Ok(Box::new(EncodingNormalizer::new())),
        other => Err(Error::UnknownFilter(other.to_owned())),
    }
}
