//! Pass-through request logging.

use std::time::Instant;

use tracing::info;

use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;

use super::{Filter, FilterConfig, Next};

/// Logs one line before and one after the rest of the chain runs.
///
/// The request and response pass through untouched.
#[derive(Debug, Default)]
pub struct PassThroughLogger {
    name: String,
}

impl PassThroughLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for PassThroughLogger {
    fn init(&mut self, config: &FilterConfig) -> Result<(), Error> {
        self.name = config.name.clone();
        info!(filter = %self.name, "pass-through logger initialised");
        Ok(())
    }

    fn handle<'a>(&'a self, req: Request, next: Next<'a>) -> BoxFuture<'a> {
        Box::pin(async move {
            let method = req.method().clone();
            let path = req.path().to_owned();
            let started = Instant::now();

            info!(filter = %self.name, %method, %path, "before");
            let res = next.run(req).await;
            info!(
                filter = %self.name,
                %method,
                %path,
                status = res.status_code().as_u16(),
                elapsed = ?started.elapsed(),
                "after"
            );

            res
        })
    }

    fn destroy(&self) {
        info!(filter = %self.name, "pass-through logger destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::StatusCode;
    use tracing_subscriber::fmt::MakeWriter;

    use crate::middleware::FilterChain;
    use crate::response::Response;
    use crate::router::Router;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    async fn hello(_req: Request) -> Response {
        Response::builder()
            .status(StatusCode::ACCEPTED)
            .header("x-origin", "endpoint")
            .text("hello")
    }

    fn get(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn logs_once_before_and_once_after_each_request() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::INFO)
            .finish();

        let responses = tracing::subscriber::with_default(subscriber, || {
            let chain = FilterChain::new(Router::new().get("/hello", hello))
                .filter(PassThroughLogger::new(), FilterConfig::new("access"))
                .unwrap();

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                vec![chain.handle(get("/hello")).await, chain.handle(get("/missing")).await]
            })
        });

        let found = &responses[0];
        assert_eq!(found.status_code(), StatusCode::ACCEPTED);
        assert_eq!(found.header("x-origin"), Some("endpoint"));
        assert_eq!(found.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(&*found.body(), b"hello");
        assert_eq!(responses[1].status_code(), StatusCode::NOT_FOUND);

        let events: Vec<String> = captured.lines()
            .into_iter()
            .filter(|line| line.contains(": before") || line.contains(": after"))
            .collect();

        assert_eq!(events.len(), 4, "{events:#?}");
        assert!(events[0].contains(": before") && events[0].contains("path=/hello"));
        assert!(events[1].contains(": after") && events[1].contains("path=/hello"));
        assert!(events[1].contains("status=202"));
        assert!(events[2].contains(": before") && events[2].contains("path=/missing"));
        assert!(events[3].contains(": after") && events[3].contains("status=404"));
        assert!(events.iter().all(|line| line.contains("filter=access")));
    }
}
