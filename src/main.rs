//! `percolate` demo server: the configured filter chain in front of a small
//! parameter echo page.
//!
//! Run with:
//!   RUST_LOG=debug cargo run -- --config percolate.toml
//!
//! Try:
//!   curl 'http://localhost:3000/echo?name=%E4%BD%A0%E5%A5%BD'
//!   curl -X POST http://localhost:3000/echo \
//!        -H 'content-type: application/x-www-form-urlencoded' \
//!        --data 'name=%E4%BD%A0%E5%A5%BD'
//!   curl -i http://localhost:3000/static/site.css

use std::path::PathBuf;

use clap::Parser;
use percolate::{Config, ContentType, Request, Response, Router, Server};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "percolate", version, about = "HTTP server with a charset-normalizing filter chain")]
struct Cli {
    /// TOML config file. Without one, both built-in filters run on every path.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), percolate::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let router = Router::new()
        .get("/", index)
        .get("/echo", echo)
        .post("/echo", echo)
        .get("/static/site.css", stylesheet);

    // Parse the address before any filter is initialised.
    let server = Server::bind(&config.server.bind)?;
    let chain = config.build_chain(router)?;
    server.serve(chain).await
}

async fn index(_req: Request) -> Response {
    Response::html(concat!(
        "<form method=\"get\" action=\"/echo\"><input name=\"name\"><button>GET</button></form>",
        "<form method=\"post\" action=\"/echo\"><input name=\"name\"><button>POST</button></form>",
    ))
}

// Lists every parameter the request carries, as decoded by the chain.
async fn echo(req: Request) -> Response {
    let mut html = format!("<h1>{} {}</h1><ul>", req.method(), escape(req.path()));
    for name in req.parameter_names() {
        for value in req.parameter_values(&name).unwrap_or_default() {
            html.push_str(&format!("<li>{} = {}</li>", escape(&name), escape(&value)));
        }
    }
    html.push_str("</ul>");
    Response::html(html)
}

async fn stylesheet(_req: Request) -> Response {
    Response::builder().bytes(ContentType::Css, b"body { font-family: sans-serif; }".to_vec())
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
