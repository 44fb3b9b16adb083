//! # percolate
//!
//! A minimal HTTP framework built around a servlet-style filter chain.
//!
//! Requests flow through an ordered list of [`middleware::Filter`]s and then
//! a radix-tree [`Router`]. Two filters ship with the crate:
//!
//! - [`PassThroughLogger`]: one log line before the rest of the chain, one after
//! - [`EncodingNormalizer`]: pins a single charset (default `UTF-8`) for form
//!   bodies, GET parameters and the response, skipping static assets
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use percolate::{Config, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), percolate::Error> {
//!     let router = Router::new().get("/search", search);
//!     let chain = Config::default().build_chain(router)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(chain).await
//! }
//!
//! async fn search(req: Request) -> Response {
//!     // GET /search?q=%E4%BD%A0%E5%A5%BD  →  "你好", not "ä½ å¥½"
//!     let q = req.parameter("q").unwrap_or_default();
//!     Response::html(format!("<p>{q}</p>"))
//! }
//! ```

mod charset;
mod config;
mod error;
mod handler;
mod params;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use charset::{Charset, DEFAULT_CHARSET, decode_latin1, reencode_latin1};
pub use config::{Config, DEFAULT_BIND, ServerConfig};
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use middleware::{EncodingNormalizer, PassThroughLogger};
pub use params::{FormParameters, Parameters};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
