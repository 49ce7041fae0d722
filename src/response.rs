//! Outgoing response state owned by a [`Ctx`](crate::Ctx).
//!
//! Handlers never build a response value themselves. They write status,
//! headers and body into the context, and the router converts whatever is
//! there into an `http::Response` once the chain finishes.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Ctx::send`](crate::Ctx::send).
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Status, headers and body accumulated while a request is handled.
///
/// The status is kept as a raw `u16` so whatever a handler sets is what it
/// reads back. Codes outside `100..=999` are sent as `500`.
pub(crate) struct Response {
    pub(crate) status: u16,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self { status: StatusCode::OK.as_u16(), headers: HeaderMap::new(), body: Vec::new() }
    }

    pub(crate) fn with_status(status: StatusCode) -> Self {
        Self { status: status.as_u16(), ..Self::new() }
    }

    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.headers.insert(name, value);
        }
    }

    pub(crate) fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.headers.append(name, value);
        }
    }

    /// Replaces the body and its content type.
    pub(crate) fn set_body(&mut self, content_type: &'static str, body: Vec<u8>) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = body;
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res
    }
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
        (Ok(name), Ok(value)) => Some((name, value)),
        _ => {
            warn!(header = name, "dropping invalid response header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_every_value() {
        let mut res = Response::new();
        res.append_header("x-multi", "a");
        res.append_header("x-multi", "b");
        res.set_header("x-single", "1");
        res.set_header("x-single", "2");

        let http = res.into_http();
        let multi: Vec<_> = http.headers().get_all("x-multi").iter().collect();
        assert_eq!(multi, ["a", "b"]);
        assert_eq!(http.headers()["x-single"], "2");
    }

    #[test]
    fn out_of_range_status_is_sent_as_500() {
        let mut res = Response::new();
        res.status = 42;
        assert_eq!(res.into_http().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_header_is_dropped() {
        let mut res = Response::new();
        res.set_header("bad header", "v");
        assert!(res.headers.is_empty());
    }
}
