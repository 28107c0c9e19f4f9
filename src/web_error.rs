//! Structured client-facing errors.
//!
//! A [`WebError`] is what a client sees when something goes wrong: an HTTP
//! status, a short machine-readable identifier, and optionally the cause and
//! some extra data. Its JSON form is
//!
//! ```text
//! {"Code": 400, "ErrorID": "VALIDATIONERROR", "OrigError": {}, "Extra": null}
//! ```
//!
//! Causes are opaque on the wire (`{}`) unless the error that produced them
//! implements [`HttpError::detail`]. Raw error text never reaches the client
//! by accident.

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

use crate::error::BoxError;

/// Error identifiers produced by courier itself.
pub mod error_id {
    /// The request body could not be read or parsed as JSON.
    pub const INVALID_REQ_JSON: &str = "INVALIDREQJSON";
    /// The decoded request failed [`Validate`](crate::Validate).
    pub const VALIDATION_ERROR: &str = "VALIDATIONERROR";
    /// A handler returned an error that does not implement
    /// [`HttpError`](crate::HttpError).
    pub const NON_WEB_APP_ERROR: &str = "NONWEBAPPERROR";
    /// The response payload could not be serialized.
    pub const RESPONSE_MARSHAL_ERROR: &str = "RESPONSEMARSHALERROR";
}

// ── HttpError ────────────────────────────────────────────────────────────────

/// An application error that knows which HTTP status and identifier it maps
/// to.
///
/// ```rust
/// use courier::HttpError;
/// use http::StatusCode;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("user {0} not found")]
/// struct UserNotFound(u64);
///
/// impl HttpError for UserNotFound {
///     fn http_error(&self) -> (StatusCode, &str) {
///         (StatusCode::NOT_FOUND, "USERNOTFOUND")
///     }
/// }
/// ```
pub trait HttpError: std::error::Error + Send + Sync + 'static {
    /// Status code and error identifier reported to the client.
    fn http_error(&self) -> (StatusCode, &str);

    /// Client-visible representation of this error, serialized as
    /// `OrigError`. Defaults to nothing, which renders as `{}`.
    fn detail(&self) -> Option<Value> {
        None
    }
}

// ── WebError ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Cause {
    source: BoxError,
    detail: Value,
}

/// The standardized error payload returned to clients.
///
/// Built once where the failure is detected, consumed once by
/// [`encode`](crate::encode). Returning it from a handler (directly or as the
/// `Err` side of a `Result`) produces a response with [`WebError::code`] as
/// status and the error itself as JSON body.
#[derive(Debug)]
pub struct WebError {
    code: StatusCode,
    error_id: Cow<'static, str>,
    cause: Option<Cause>,
    extra: Option<Value>,
}

impl WebError {
    pub fn new(code: StatusCode, error_id: impl Into<Cow<'static, str>>) -> Self {
        Self { code, error_id: error_id.into(), cause: None, extra: None }
    }

    /// `400 Bad Request` with the given identifier.
    pub fn bad_request(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_id)
    }

    /// `401 Unauthorized` with the given identifier.
    pub fn unauthorized(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_id)
    }

    /// `403 Forbidden` with the given identifier.
    pub fn forbidden(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::FORBIDDEN, error_id)
    }

    /// `404 Not Found` with the given identifier.
    pub fn not_found(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_id)
    }

    /// `409 Conflict` with the given identifier.
    pub fn conflict(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::CONFLICT, error_id)
    }

    /// `500 Internal Server Error` with the given identifier.
    pub fn internal(error_id: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error_id)
    }

    /// Attaches the underlying error. It serializes as `{}`.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(Cause { source: cause.into(), detail: Value::Object(Default::default()) });
        self
    }

    /// Attaches extra data, serialized as `Extra`.
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn code(&self) -> StatusCode { self.code }
    pub fn error_id(&self) -> &str { &self.error_id }
    pub fn extra(&self) -> Option<&Value> { self.extra.as_ref() }

    /// The wrapped error, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_ref().map(|c| &*c.source)
    }

    /// Wraps an application-declared error using the status and identifier
    /// it reports for itself.
    pub(crate) fn declared(err: Box<dyn HttpError + Send + Sync>) -> Self {
        let (code, error_id) = err.http_error();
        let error_id = error_id.to_owned();
        let detail = err.detail().unwrap_or_else(|| Value::Object(Default::default()));
        let source: BoxError = err;
        Self {
            code,
            error_id: Cow::Owned(error_id),
            cause: Some(Cause { source, detail }),
            extra: None,
        }
    }

    /// Wraps an error that declared nothing about itself.
    pub(crate) fn unhandled(err: BoxError) -> Self {
        Self::internal(error_id::NON_WEB_APP_ERROR).with_cause(err)
    }
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REST Error {}: {} (original: ", self.code.as_u16(), self.error_id)?;
        match &self.cause {
            Some(cause) => write!(f, "{})", cause.source),
            None => f.write_str("nil)"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| &*c.source as &(dyn std::error::Error + 'static))
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

impl Serialize for WebError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("WebError", 4)?;
        s.serialize_field("Code", &self.code.as_u16())?;
        s.serialize_field("ErrorID", &self.error_id)?;
        s.serialize_field("OrigError", &self.cause.as_ref().map(|c| &c.detail))?;
        s.serialize_field("Extra", &self.extra)?;
        s.end()
    }
}

#[derive(serde::Deserialize)]
struct WireError {
    #[serde(rename = "Code")]
    code: u16,
    #[serde(rename = "ErrorID")]
    error_id: String,
    #[serde(rename = "Extra", default)]
    extra: Option<Value>,
}

/// Reads the JSON form back, for clients of courier services. The cause does
/// not survive the trip.
impl<'de> Deserialize<'de> for WebError {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireError::deserialize(deserializer)?;
        let code = StatusCode::from_u16(wire.code).map_err(de::Error::custom)?;
        Ok(Self {
            code,
            error_id: Cow::Owned(wire.error_id),
            cause: None,
            extra: wire.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded")]
    struct QuotaExceeded;

    impl HttpError for QuotaExceeded {
        fn http_error(&self) -> (StatusCode, &str) {
            (StatusCode::TOO_MANY_REQUESTS, "QUOTAEXCEEDED")
        }

        fn detail(&self) -> Option<Value> {
            Some(json!({"limit": 10}))
        }
    }

    #[test]
    fn bad_request_helper_prefills_status() {
        let err = WebError::bad_request("MISSINGNAME");
        assert_eq!(err.code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_id(), "MISSINGNAME");
        assert!(err.cause().is_none());
        assert!(err.extra().is_none());
    }

    #[test]
    fn display_without_cause_says_nil() {
        let err = WebError::not_found("NOUSER");
        assert_eq!(err.to_string(), "REST Error 404: NOUSER (original: nil)");
    }

    #[test]
    fn display_includes_cause_text() {
        let err = WebError::bad_request("BADAGE").with_cause("age must be positive");
        assert_eq!(err.to_string(), "REST Error 400: BADAGE (original: age must be positive)");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn serializes_every_field_with_opaque_cause() {
        let err = WebError::conflict("TAKEN")
            .with_cause("duplicate key value violates unique constraint")
            .with_extra(json!({"field": "email"}));

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({
                "Code": 409,
                "ErrorID": "TAKEN",
                "OrigError": {},
                "Extra": {"field": "email"},
            })
        );
    }

    #[test]
    fn absent_cause_and_extra_serialize_as_null() {
        let value = serde_json::to_value(WebError::forbidden("NOPE")).unwrap();
        assert_eq!(value["OrigError"], Value::Null);
        assert_eq!(value["Extra"], Value::Null);
    }

    #[test]
    fn declared_error_uses_its_own_status_id_and_detail() {
        let err = WebError::declared(Box::new(QuotaExceeded));
        assert_eq!(err.code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.error_id(), "QUOTAEXCEEDED");
        assert_eq!(err.cause().map(ToString::to_string).as_deref(), Some("quota exceeded"));

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["OrigError"], json!({"limit": 10}));
    }

    #[test]
    fn unhandled_error_is_500_nonwebapperror() {
        let io = std::io::Error::other("disk on fire");
        let err = WebError::unhandled(Box::new(io));
        assert_eq!(err.code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_id(), error_id::NON_WEB_APP_ERROR);

        let body = serde_json::to_string(&err).unwrap();
        assert!(!body.contains("disk on fire"));
    }

    #[test]
    fn json_form_reads_back_code_and_id() {
        let original = WebError::bad_request("BADNAME").with_extra(json!([1, 2]));
        let bytes = serde_json::to_vec(&original).unwrap();

        let decoded: WebError = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.code(), original.code());
        assert_eq!(decoded.error_id(), original.error_id());
        assert_eq!(decoded.extra(), Some(&json!([1, 2])));
    }

    #[test]
    fn reading_back_rejects_impossible_status() {
        let res = serde_json::from_str::<WebError>(r#"{"Code": 42, "ErrorID": "X"}"#);
        assert!(res.is_err());
    }
}
