//! Endpoint handlers and type erasure.
//!
//! The router stores handlers of different concrete types in one tree per
//! method, so each handler is erased behind `dyn ErasedHandler`:
//!
//! ```text
//! async fn echo(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/echo", echo)
//! echo.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(echo))                      ← stored as BoxedHandler
//!        ↓
//! handler.call(req)                              ← one virtual call per request
//! ```
//!
//! Filters use the same boxed future type, borrowed for the lifetime of the
//! chain they run in (see [`crate::middleware`]).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future resolving to a [`Response`].
///
/// `'a` lets filter futures borrow the chain they belong to; endpoint
/// handlers always produce `BoxFuture<'static>`.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid endpoint handler: any
/// `async fn(Request) -> impl IntoResponse`.
///
/// Sealed; only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
