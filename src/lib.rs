//! # courier
//!
//! JSON in, JSON out, for hyper handlers.
//!
//! courier does three things around a handler and nothing else:
//!
//! - **Decode**: read the request body once, parse it as JSON into your type,
//!   optionally run its [`Validate`] impl. Failures become `400` errors.
//! - **Encode**: turn whatever the handler returned into a status code and a
//!   JSON body, with `Content-Type: application/json`.
//! - **Wire**: [`handle_func`] composes the two around an `async fn` and
//!   hands back a hyper `Service`.
//!
//! What a handler returns decides the response:
//!
//! | Returned | Status | Body |
//! |---|---|---|
//! | [`Json`] / [`Reply::json`] / `()` | 200 | the value |
//! | [`Envelope`] / [`Reply::with_status`] | chosen | the value |
//! | [`WebError`] | its code | the error |
//! | [`Reply::declared`] (an [`HttpError`]) | reported code | wrapped error |
//! | `Err(e)` where `e` is an [`HttpError`] | reported code | wrapped error |
//! | [`Reply::unhandled`] (any other error) | 500 | `NONWEBAPPERROR` |
//! | [`Reply::Done`] | whatever the handler wrote | whatever the handler wrote |
//!
//! TLS, routing and content negotiation are out of scope: only JSON is
//! spoken.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use courier::{Envelope, Request, ResponseWriter, Server, Validate, WebError, handle_func};
//! use http::StatusCode;
//!
//! #[derive(serde::Deserialize, serde::Serialize)]
//! struct NewUser { name: String }
//!
//! impl Validate for NewUser {
//!     type Error = &'static str;
//!     fn validate(&self) -> Result<(), Self::Error> {
//!         if self.name.is_empty() { Err("name is required") } else { Ok(()) }
//!     }
//! }
//!
//! async fn create_user(mut req: Request, _w: ResponseWriter) -> Result<Envelope, WebError> {
//!     let user: NewUser = req.decode_validated().await?;
//!     Ok(Envelope::new(StatusCode::CREATED, user))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), courier::Error> {
//!     Server::bind("0.0.0.0:3000").await?
//!         .serve(handle_func(create_user))
//!         .await
//! }
//! ```

mod codec;
mod error;
mod handler;
mod reply;
mod request;
mod server;
mod web_error;
mod writer;

pub use codec::{Validate, decode, decode_validated, encode};
pub use error::{BodyError, BoxError, Error};
pub use handler::{Handler, HandlerService, handle_func};
pub use reply::{Envelope, IntoReply, Json, Payload, Reply};
pub use request::Request;
pub use server::Server;
pub use web_error::{HttpError, WebError, error_id};
pub use writer::ResponseWriter;
