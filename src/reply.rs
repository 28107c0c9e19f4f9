//! Handler results and the [`IntoReply`] conversion trait.
//!
//! A handler returns anything that converts into a [`Reply`]. The reply says
//! *what* to send; [`encode`](crate::encode) decides the status line and the
//! JSON bytes.

use std::fmt;

use http::StatusCode;
use serde::Serialize;

use crate::error::BoxError;
use crate::web_error::{HttpError, WebError};

// ── Payload ──────────────────────────────────────────────────────────────────

type Serializer = Box<dyn FnOnce() -> serde_json::Result<Vec<u8>> + Send>;

/// Any serializable value, serialized only when the response is encoded.
///
/// Deferring serialization keeps a failure inside the encode step, where it
/// becomes a `500 RESPONSEMARSHALERROR` instead of a panic in the handler.
pub struct Payload(Serializer);

impl Payload {
    pub fn new<T: Serialize + Send + 'static>(value: T) -> Self {
        Self(Box::new(move || serde_json::to_vec(&value)))
    }

    pub(crate) fn into_json(self) -> serde_json::Result<Vec<u8>> {
        (self.0)()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// A successful response that needs a status other than `200 OK`.
///
/// ```rust
/// use courier::Envelope;
/// use http::StatusCode;
///
/// Envelope::new(StatusCode::CREATED, serde_json::json!({"id": 42}));
/// ```
#[derive(Debug)]
pub struct Envelope {
    pub(crate) status: StatusCode,
    pub(crate) payload: Payload,
}

impl Envelope {
    pub fn new<T: Serialize + Send + 'static>(status: StatusCode, payload: T) -> Self {
        Self { status, payload: Payload::new(payload) }
    }

    pub fn status(&self) -> StatusCode { self.status }
}

// ── Reply ────────────────────────────────────────────────────────────────────

/// Everything a handler can ask courier to send.
///
/// | Variant | Status | Body |
/// |---|---|---|
/// | `Done` | nothing written | nothing written |
/// | `Envelope` | envelope status | envelope payload |
/// | `Error` | error code | the error |
/// | `Declared` | reported code | error with reported code and id |
/// | `Unhandled` | 500 | `NONWEBAPPERROR` error |
/// | `Payload` | 200 | the payload |
pub enum Reply {
    /// The handler already wrote the response through its
    /// [`ResponseWriter`](crate::ResponseWriter).
    Done,
    Envelope(Envelope),
    Error(WebError),
    Declared(Box<dyn HttpError + Send + Sync>),
    Unhandled(BoxError),
    Payload(Payload),
}

impl Reply {
    /// `200 OK` with `value` as JSON.
    pub fn json<T: Serialize + Send + 'static>(value: T) -> Self {
        Self::Payload(Payload::new(value))
    }

    /// `status` with `value` as JSON.
    pub fn with_status<T: Serialize + Send + 'static>(status: StatusCode, value: T) -> Self {
        Self::Envelope(Envelope::new(status, value))
    }

    /// An error that chose its own status and identifier.
    pub fn declared<E: HttpError>(err: E) -> Self {
        Self::Declared(Box::new(err))
    }

    /// An error courier knows nothing about. Reported as `500 NONWEBAPPERROR`.
    pub fn unhandled(err: impl Into<BoxError>) -> Self {
        Self::Unhandled(err.into())
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Envelope(env) => f.debug_tuple("Envelope").field(env).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Self::Declared(err) => f.debug_tuple("Declared").field(err).finish(),
            Self::Unhandled(err) => f.debug_tuple("Unhandled").field(err).finish(),
            Self::Payload(p) => f.debug_tuple("Payload").field(p).finish(),
        }
    }
}

impl From<Envelope> for Reply {
    fn from(env: Envelope) -> Self { Self::Envelope(env) }
}

impl From<WebError> for Reply {
    fn from(err: WebError) -> Self { Self::Error(err) }
}

impl From<Payload> for Reply {
    fn from(p: Payload) -> Self { Self::Payload(p) }
}

// ── Json ─────────────────────────────────────────────────────────────────────

/// Typed `200 OK` JSON response: `return Json(user)`.
#[derive(Debug)]
pub struct Json<T>(pub T);

// ── IntoReply ────────────────────────────────────────────────────────────────

/// Conversion into a [`Reply`].
///
/// Implement on your own types to return them directly from handlers.
///
/// # Example
///
/// ```rust
/// use courier::{IntoReply, Reply};
/// use http::StatusCode;
///
/// struct Accepted { job: u64 }
///
/// impl IntoReply for Accepted {
///     fn into_reply(self) -> Reply {
///         Reply::with_status(StatusCode::ACCEPTED, serde_json::json!({"job": self.job}))
///     }
/// }
/// ```
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for Envelope {
    fn into_reply(self) -> Reply { Reply::Envelope(self) }
}

impl IntoReply for WebError {
    fn into_reply(self) -> Reply { Reply::Error(self) }
}

impl IntoReply for Payload {
    fn into_reply(self) -> Reply { Reply::Payload(self) }
}

impl<T: Serialize + Send + 'static> IntoReply for Json<T> {
    fn into_reply(self) -> Reply { Reply::json(self.0) }
}

/// `200 OK` with body `null`.
impl IntoReply for () {
    fn into_reply(self) -> Reply { Reply::json(()) }
}

/// Lets handlers return `Result<_, WebError>` and use `?` on [`decode`](crate::decode).
impl<T: IntoReply> IntoReply for Result<T, WebError> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(err) => Reply::Error(err),
        }
    }
}

impl<T: IntoReply> IntoReply for Result<T, Reply> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(reply) => reply,
        }
    }
}

/// Errors surfaced this way are reported as `500 NONWEBAPPERROR`.
impl<T: IntoReply> IntoReply for Result<T, BoxError> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(err) => Reply::Unhandled(err),
        }
    }
}

/// Lets handlers use `?` on their own [`HttpError`] types.
impl<T: IntoReply, E: HttpError> IntoReply for Result<T, E> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(err) => Reply::declared(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ok_result_unwraps_to_inner_reply() {
        let res: Result<Json<u8>, WebError> = Ok(Json(7));
        let Reply::Payload(p) = res.into_reply() else { panic!("expected payload") };
        assert_eq!(p.into_json().unwrap(), b"7");
    }

    #[test]
    fn err_result_becomes_error_variant() {
        let res: Result<Json<u8>, WebError> = Err(WebError::bad_request("NOPE"));
        assert_matches!(res.into_reply(), Reply::Error(e) if e.error_id() == "NOPE");
    }

    #[test]
    fn boxed_error_result_is_unhandled() {
        let res: Result<(), BoxError> = Err("boom".into());
        assert_matches!(res.into_reply(), Reply::Unhandled(_));
    }

    #[test]
    fn unit_is_null_payload() {
        let Reply::Payload(p) = ().into_reply() else { panic!("expected payload") };
        assert_eq!(p.into_json().unwrap(), b"null");
    }

    #[test]
    fn envelope_keeps_status() {
        assert_matches!(
            Reply::with_status(StatusCode::CREATED, 1),
            Reply::Envelope(env) if env.status() == StatusCode::CREATED
        );
    }

    #[derive(Debug, thiserror::Error)]
    #[error("payment required")]
    struct Unpaid;

    impl HttpError for Unpaid {
        fn http_error(&self) -> (StatusCode, &str) {
            (StatusCode::PAYMENT_REQUIRED, "UNPAID")
        }
    }

    #[test]
    fn http_error_result_becomes_declared() {
        let res: Result<Json<u8>, Unpaid> = Err(Unpaid);
        let Reply::Declared(err) = res.into_reply() else { panic!("expected declared") };
        assert_eq!(err.http_error(), (StatusCode::PAYMENT_REQUIRED, "UNPAID"));
    }
}
