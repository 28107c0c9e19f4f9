//! The outgoing response channel handed to every handler.
//!
//! Writes follow the usual order: headers, then the status line (once), then
//! the body. Anything that breaks that order is ignored and logged rather than
//! failing the request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

#[derive(Debug, Default)]
struct Buffer {
    status: Option<StatusCode>,
    header_writes: usize,
    headers: HeaderMap,
    body: BytesMut,
}

impl Buffer {
    fn commit(&mut self, status: StatusCode) {
        self.header_writes += 1;
        match self.status {
            Some(current) => warn!(%current, ignored = %status, "superfluous write_header"),
            None => self.status = Some(status),
        }
    }
}

/// Buffered HTTP response under construction.
///
/// Cloning is cheap and every clone writes into the same response, so a
/// handler may keep one while courier keeps another. The buffer becomes the
/// real `http::Response` once the handler has returned and its
/// [`Reply`](crate::Reply) has been encoded.
///
/// A handler that writes the response itself returns
/// [`Reply::Done`](crate::Reply::Done) so courier does not write again:
///
/// ```rust
/// use courier::{Reply, Request, ResponseWriter};
/// use http::StatusCode;
///
/// async fn teapot(_req: Request, w: ResponseWriter) -> Reply {
///     w.write_header(StatusCode::IM_A_TEAPOT);
///     w.write(b"short and stout");
///     Reply::Done
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<Buffer>>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, Buffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets a header, replacing any previous value. Ignored once the status
    /// has been written.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        let mut buf = self.buffer();
        if buf.status.is_some() {
            warn!(header = %name, "header set after status was written, ignoring");
            return;
        }
        buf.headers.insert(name, value);
    }

    /// Writes the status line. Only the first call has any effect.
    pub fn write_header(&self, status: StatusCode) {
        self.buffer().commit(status);
    }

    /// Appends to the body, writing `200 OK` first if no status was written.
    pub fn write(&self, bytes: &[u8]) {
        let mut buf = self.buffer();
        if buf.status.is_none() {
            buf.commit(StatusCode::OK);
        }
        buf.body.extend_from_slice(bytes);
    }

    /// The status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> { self.buffer().status }

    /// How many times a status line was written, superfluous calls included.
    pub fn header_writes(&self) -> usize { self.buffer().header_writes }

    /// Number of body bytes written so far.
    pub fn body_len(&self) -> usize { self.buffer().body.len() }

    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.buffer().headers.get(name).cloned()
    }

    /// Takes what was written. Nothing written at all yields an empty `200`.
    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let buf = std::mem::take(&mut *self.buffer());

        let mut res = http::Response::new(Full::new(buf.body.freeze()));
        *res.status_mut() = buf.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = buf.headers;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, LOCATION};
    use http_body_util::BodyExt;

    async fn body_of(res: http::Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn untouched_writer_is_empty_200() {
        let w = ResponseWriter::new();
        assert_eq!(w.status(), None);
        assert_eq!(w.header_writes(), 0);

        let res = w.into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().is_empty());
        assert!(body_of(res).await.is_empty());
    }

    #[test]
    fn first_status_wins() {
        let w = ResponseWriter::new();
        w.write_header(StatusCode::CREATED);
        w.write_header(StatusCode::BAD_GATEWAY);

        assert_eq!(w.status(), Some(StatusCode::CREATED));
        assert_eq!(w.header_writes(), 2);
    }

    #[test]
    fn body_write_implies_200() {
        let w = ResponseWriter::new();
        w.write(b"hi");
        assert_eq!(w.status(), Some(StatusCode::OK));
        assert_eq!(w.body_len(), 2);
    }

    #[test]
    fn headers_after_status_are_dropped() {
        let w = ResponseWriter::new();
        w.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        w.write_header(StatusCode::ACCEPTED);
        w.set_header(LOCATION, HeaderValue::from_static("/later"));

        assert_eq!(w.header(&CONTENT_TYPE), Some(HeaderValue::from_static("text/plain")));
        assert_eq!(w.header(&LOCATION), None);
    }

    #[tokio::test]
    async fn clones_share_one_response() {
        let w = ResponseWriter::new();
        let handler_side = w.clone();
        handler_side.write_header(StatusCode::NO_CONTENT);
        handler_side.write(b"");
        w.write(b"tail");

        let res = w.into_response();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(body_of(res).await, Bytes::from_static(b"tail"));
    }
}
