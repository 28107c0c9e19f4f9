//! The two halves of the adapter: JSON in, JSON out.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{BodyError, BoxError};
use crate::reply::Reply;
use crate::request::Request;
use crate::web_error::{WebError, error_id};
use crate::writer::ResponseWriter;

/// Written verbatim when the real payload cannot be serialized.
const MARSHAL_FALLBACK: &[u8] = br#"{"Code": 500, "ErrorId": "RESPONSEMARSHALERROR"}"#;

// ── Decode ───────────────────────────────────────────────────────────────────

/// A decoded request that can check its own invariants.
///
/// ```rust
/// use courier::Validate;
///
/// #[derive(serde::Deserialize)]
/// struct NewUser { name: String }
///
/// impl Validate for NewUser {
///     type Error = &'static str;
///
///     fn validate(&self) -> Result<(), Self::Error> {
///         if self.name.is_empty() { Err("name is required") } else { Ok(()) }
///     }
/// }
/// ```
pub trait Validate {
    type Error: Into<BoxError>;

    fn validate(&self) -> Result<(), Self::Error>;
}

/// Reads the request body and parses it as JSON.
///
/// The body is consumed and dropped before this returns, whatever the
/// outcome. Only the first JSON value is read; anything after it is ignored.
/// The `Content-Type` header is not inspected.
///
/// # Errors
///
/// `400 INVALIDREQJSON` if the body cannot be read, is empty, was already
/// consumed, or is not valid JSON for `T`.
pub async fn decode<T: DeserializeOwned>(req: &mut Request) -> Result<T, WebError> {
    parse(req).await.map_err(|err| {
        debug!(error = %err, "rejecting request body");
        WebError::bad_request(error_id::INVALID_REQ_JSON).with_cause(err)
    })
}

/// Like [`decode`], then runs [`Validate::validate`] on the result.
///
/// # Errors
///
/// Everything [`decode`] returns, plus `400 VALIDATIONERROR` when validation
/// fails. Validation never runs on a body that did not parse.
pub async fn decode_validated<T>(req: &mut Request) -> Result<T, WebError>
where
    T: DeserializeOwned + Validate,
{
    let data: T = decode(req).await?;
    if let Err(err) = data.validate() {
        let err: BoxError = err.into();
        debug!(error = %err, "request failed validation");
        return Err(WebError::bad_request(error_id::VALIDATION_ERROR).with_cause(err));
    }
    Ok(data)
}

async fn parse<T: DeserializeOwned>(req: &mut Request) -> Result<T, BodyError> {
    let bytes = read_body(req).await?;
    match serde_json::Deserializer::from_slice(&bytes).into_iter::<T>().next() {
        Some(value) => Ok(value?),
        None => Err(BodyError::Empty),
    }
}

async fn read_body(req: &mut Request) -> Result<Bytes, BodyError> {
    let body = req.take_body().ok_or(BodyError::Consumed)?;
    let collected = body.collect().await.map_err(BodyError::Read)?;
    Ok(collected.to_bytes())
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Writes `reply` to `w` as a JSON response.
///
/// `_req_headers` are the headers of the request being answered; they are
/// reserved for content negotiation and not used yet.
///
/// Never fails. [`Reply::Done`] writes nothing. Every other reply sets
/// `Content-Type: application/json`, writes the status once and the body
/// once. If the payload does not serialize, the status becomes 500 and the
/// body `{"Code": 500, "ErrorId": "RESPONSEMARSHALERROR"}`.
pub fn encode(w: &ResponseWriter, _req_headers: &HeaderMap, reply: Reply) {
    let (status, body) = match reply {
        Reply::Done => return,
        Reply::Envelope(env) => (env.status, env.payload.into_json()),
        Reply::Error(err) => (err.code(), serde_json::to_vec(&err)),
        Reply::Declared(err) => {
            let err = WebError::declared(err);
            (err.code(), serde_json::to_vec(&err))
        }
        Reply::Unhandled(err) => {
            error!(error = %err, "handler returned an undeclared error");
            let err = WebError::unhandled(err);
            (err.code(), serde_json::to_vec(&err))
        }
        Reply::Payload(payload) => (StatusCode::OK, payload.into_json()),
    };

    w.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let (status, body) = match body {
        Ok(body) => (status, body),
        Err(err) => {
            error!(error = %err, intended = status.as_u16(), "failed to serialize response");
            (StatusCode::INTERNAL_SERVER_ERROR, MARSHAL_FALLBACK.to_vec())
        }
    };

    debug!(status = status.as_u16(), bytes = body.len(), "encoded reply");
    w.write_header(status);
    w.write(&body);
}
