//! Infrastructure error types.

/// Boxed error used for body read failures, validation failures and
/// undeclared handler errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by courier's fallible server operations.
///
/// Application-level errors (400, 404, 422, etc.) are expressed as
/// [`WebError`](crate::WebError) values returned from handlers, not as
/// `Error`s. This type surfaces infrastructure failures: resolving the listen
/// address or binding to a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a request body could not be turned into a value.
///
/// Always surfaced to clients wrapped in a `400 INVALIDREQJSON`
/// [`WebError`](crate::WebError).
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body already consumed")]
    Consumed,

    #[error("request body is empty")]
    Empty,

    #[error("failed to read request body: {0}")]
    Read(#[source] BoxError),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}
