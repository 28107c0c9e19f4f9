//! Incoming HTTP request type.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Body;
use serde::de::DeserializeOwned;

use crate::codec::{self, Validate};
use crate::error::BoxError;
use crate::web_error::WebError;

pub(crate) type BoxBody = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request: the head plus a body that can be read once.
pub struct Request {
    parts: Parts,
    body: Option<BoxBody>,
}

impl Request {
    /// Wraps any `http::Request` whose body yields [`Bytes`]: hyper's
    /// `Incoming` in production, `Full<Bytes>` in tests.
    pub fn new<B>(req: http::Request<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body: BoxBody = body.map_err(Into::into).boxed_unsync();
        Self { parts, body: Some(body) }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the JSON body. See [`decode`](crate::decode).
    pub async fn decode<T: DeserializeOwned>(&mut self) -> Result<T, WebError> {
        codec::decode(self).await
    }

    /// Decodes and validates the JSON body. See
    /// [`decode_validated`](crate::decode_validated).
    pub async fn decode_validated<T>(&mut self) -> Result<T, WebError>
    where
        T: DeserializeOwned + Validate,
    {
        codec::decode_validated(self).await
    }

    /// Hands out the body. Every later call returns `None`.
    pub(crate) fn take_body(&mut self) -> Option<BoxBody> {
        self.body.take()
    }
}
