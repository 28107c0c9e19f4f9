//! Handler trait, type erasure, and the wiring into hyper.
//!
//! # From `async fn` to hyper `Service`
//!
//! ```text
//! async fn create(req: Request, w: ResponseWriter) -> impl IntoReply   ← user writes this
//!        ↓ handle_func(create)
//! Arc::new(FnHandler(create))                 ← Handler blanket impl
//!        ↓  stored in HandlerService
//! service.call(http::Request<B>)              ← once per request, from hyper
//!        ↓
//! handler.call(req, w).await → Reply          ← one vtable dispatch
//!        ↓
//! encode(&w, &headers, reply)                 ← status + JSON body
//!        ↓
//! w.into_response()                           ← http::Response<Full<Bytes>>
//! ```
//!
//! Panics inside a handler are not caught here; they unwind into whatever the
//! surrounding server does with a panicking task.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::service::Service;
use tracing::Instrument;

use crate::codec::encode;
use crate::error::BoxError;
use crate::reply::{IntoReply, Reply};
use crate::request::Request;
use crate::writer::ResponseWriter;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Reply`].
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request, w: ResponseWriter) -> BoxFuture<Reply>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request, w: ResponseWriter) -> impl IntoReply
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, req: Request, w: ResponseWriter) -> BoxFuture<Reply> {
        let fut = (self.0)(req, w);
        Box::pin(async move { fut.await.into_reply() })
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Turns a handler into a hyper [`Service`].
///
/// The service feeds whatever the handler returns, unchanged, to
/// [`encode`](crate::encode) and answers with the written response. It never
/// fails.
///
/// ```rust,no_run
/// use courier::{Json, Request, ResponseWriter, Server, handle_func};
///
/// async fn ping(_req: Request, _w: ResponseWriter) -> Json<&'static str> {
///     Json("pong")
/// }
///
/// # async fn run() -> Result<(), courier::Error> {
/// Server::bind("127.0.0.1:3000").await?.serve(handle_func(ping)).await
/// # }
/// ```
pub fn handle_func(handler: impl Handler) -> HandlerService {
    HandlerService { handler: handler.into_boxed_handler() }
}

/// A handler wired to the encode step. Cheap to clone.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
}

impl<B> Service<http::Request<B>> for HandlerService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Infallible>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let span = tracing::debug_span!("request", method = %req.method(), path = %req.uri().path());
        let req_headers = req.headers().clone();
        let req = Request::new(req);
        let w = ResponseWriter::new();
        let reply = ErasedHandler::call(&*self.handler, req, w.clone());

        Box::pin(
            async move {
                let reply = reply.await;
                encode(&w, &req_headers, reply);
                Ok(w.into_response())
            }
            .instrument(span),
        )
    }
}
