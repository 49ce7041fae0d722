//! The per-request context handed to every handler in a chain.
//!
//! A [`Ctx`] owns both halves of one exchange: the parsed request (line,
//! headers, body, route params) and the response being built. Handlers
//! receive it as `&mut Ctx`. The borrow ends when their future completes,
//! so nothing can keep a context alive past the request it belongs to.

use std::any::Any;
use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, Method, Uri, Version};
use multer::Multipart;
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::body::{BodyStream, RequestBody};
use crate::error::Error;
use crate::form::{self, MultipartForm};
use crate::handler::{BoxedHandler, HandlerResult};
use crate::response::{ContentType, Response};
use crate::router::Config;
use crate::scope::{Scope, Value};

// ── Connection info ───────────────────────────────────────────────────────────

/// Negotiated TLS parameters of the connection a request arrived on.
///
/// The router itself speaks plain TCP. An acceptor that terminates TLS
/// fills this in and passes it through [`ConnInfo::with_tls`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsInfo {
    /// e.g. `"TLSv1.3"`.
    pub version: String,
    pub cipher_suite: String,
    /// SNI host name sent by the client.
    pub server_name: Option<String>,
    /// Negotiated ALPN protocol, e.g. `b"h2"`.
    pub alpn_protocol: Option<Vec<u8>>,
}

/// Facts about the connection a request arrived on.
#[derive(Clone, Debug)]
pub struct ConnInfo {
    pub(crate) remote_addr: SocketAddr,
    pub(crate) tls: Option<TlsInfo>,
}

impl ConnInfo {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self { remote_addr, tls: None }
    }

    pub fn with_tls(mut self, tls: TlsInfo) -> Self {
        self.tls = Some(tls);
        self
    }

    /// The peer used for simulated requests: `0.0.0.0:0`, no TLS.
    pub(crate) fn simulated() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 0)))
    }
}

// ── Ctx ───────────────────────────────────────────────────────────────────────

/// One in-flight request and the response being written for it.
pub struct Ctx {
    config: Arc<Config>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    conn: ConnInfo,
    body: RequestBody,
    route: Option<Arc<str>>,
    params: Vec<(String, String)>,
    locals: Vec<(String, Value)>,
    scope: Scope,
    chain: Vec<BoxedHandler>,
    index: usize,
    pub(crate) response: Response,
}

pub(crate) struct Parts {
    pub(crate) config: Arc<Config>,
    pub(crate) request: http::request::Parts,
    pub(crate) conn: ConnInfo,
    pub(crate) body: RequestBody,
    pub(crate) route: Option<Arc<str>>,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) scope: Scope,
    pub(crate) chain: Vec<BoxedHandler>,
}

impl Ctx {
    pub(crate) fn new(parts: Parts) -> Self {
        let Parts { config, request, conn, body, route, params, scope, chain } = parts;
        Self {
            config,
            method: request.method,
            uri: request.uri,
            version: request.version,
            headers: request.headers,
            conn,
            body,
            route,
            params,
            locals: Vec::new(),
            scope,
            chain,
            index: 0,
            response: Response::new(),
        }
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    /// Runs the next handler in the chain and returns its result.
    ///
    /// Middleware calls this to hand control downstream. Past the end of the
    /// chain it resolves to `Ok(())`, or to a `404` error when no route
    /// matched the request.
    pub fn next(&mut self) -> BoxFuture<'_, HandlerResult> {
        match self.chain.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler.call(self)
            }
            None if self.route.is_none() => {
                let err = Error::status(
                    http::StatusCode::NOT_FOUND,
                    format!("Cannot {} {}", self.method, self.uri.path()),
                );
                Box::pin(futures::future::ready(Err(err)))
            }
            None => Box::pin(futures::future::ready(Ok(()))),
        }
    }

    // ── Request line and connection ───────────────────────────────────────────

    pub fn method(&self) -> &str { self.method.as_str() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn http_version(&self) -> Version { self.version }
    pub fn remote_addr(&self) -> SocketAddr { self.conn.remote_addr }
    pub fn tls(&self) -> Option<&TlsInfo> { self.conn.tls.as_ref() }
    pub fn config(&self) -> &Config { &self.config }

    /// Host the client addressed: the `Host` header, else the URI authority.
    pub fn hostname(&self) -> &str {
        match self.headers.get(HOST).and_then(|v| v.to_str().ok()) {
            Some(host) => host,
            None => self.uri.authority().map_or("", |a| a.as_str()),
        }
    }

    /// The registered pattern that matched, e.g. `/users/:id`. Empty when
    /// no route matched.
    pub fn route_path(&self) -> &str {
        self.route.as_deref().unwrap_or("")
    }

    // ── Params, query, headers ────────────────────────────────────────────────

    /// Named route parameter, `""` when absent.
    pub fn params(&self, name: &str) -> &str {
        self.params.iter()
            .find(|(k, _)| k == name)
            .map_or("", |(_, v)| v.as_str())
    }

    /// First decoded query value for `name`, `""` when absent.
    pub fn query(&self, name: &str) -> String {
        let Some(query) = self.uri.query() else { return String::new() };
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    /// Case-insensitive request header lookup, `""` when absent or not
    /// visible ASCII.
    pub fn get(&self, name: &str) -> &str {
        self.headers.get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap { &self.headers }

    // ── Body ──────────────────────────────────────────────────────────────────

    /// The collected body. Empty when the router streams bodies.
    pub fn body_raw(&self) -> &[u8] {
        match &self.body {
            RequestBody::Buffered(bytes) => bytes,
            RequestBody::Streaming(_) => &[],
        }
    }

    /// The live body stream, when the router is configured to stream.
    pub fn body_stream(&mut self) -> Option<&mut BodyStream> {
        match &mut self.body {
            RequestBody::Streaming(stream) => Some(stream),
            RequestBody::Buffered(_) => None,
        }
    }

    /// A reader over the request body: the live stream in streaming mode,
    /// the collected bytes otherwise.
    pub fn body_reader(&mut self) -> Box<dyn AsyncRead + Send + Unpin + '_> {
        match &mut self.body {
            RequestBody::Buffered(bytes) => Box::new(Cursor::new(bytes.clone())),
            RequestBody::Streaming(stream) => Box::new(stream),
        }
    }

    /// Sets a deadline for reading the rest of the body.
    ///
    /// Only streaming mode is affected: the handler then runs before the body
    /// has arrived and later reads fail with `TimedOut` once `deadline`
    /// passes. A buffered body is already complete, so this is a no-op.
    pub fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), Error> {
        if let RequestBody::Streaming(stream) = &mut self.body {
            stream.set_deadline(deadline);
        }
        Ok(())
    }

    /// Parses a `multipart/form-data` body.
    pub async fn multipart_form(&mut self) -> Result<MultipartForm, Error> {
        let boundary = multer::parse_boundary(self.get(CONTENT_TYPE.as_str()))?;
        match &mut self.body {
            RequestBody::Buffered(bytes) => {
                let bytes = bytes.clone();
                let stream = futures::stream::once(async move { Ok::<_, Infallible>(bytes) });
                form::read_form(Multipart::new(stream, boundary)).await
            }
            RequestBody::Streaming(stream) => {
                form::read_form(Multipart::new(stream, boundary)).await
            }
        }
    }

    // ── Locals and scope ──────────────────────────────────────────────────────

    /// Stores a per-request value, replacing any previous value for `key`.
    pub fn set_local(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        let key = key.into();
        let value: Value = Arc::new(value);
        match self.locals.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.locals.push((key, value)),
        }
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Typed lookup into the locals.
    pub fn local_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.local(key)?.downcast_ref::<T>()
    }

    /// Visits every local in insertion order.
    pub fn visit_locals(&self, mut f: impl FnMut(&str, &Value)) {
        for (k, v) in &self.locals {
            f(k, v);
        }
    }

    /// The request scope. Cancelled when the request finishes.
    pub fn context(&self) -> &Scope { &self.scope }

    pub fn set_context(&mut self, scope: Scope) {
        self.scope = scope;
    }

    // ── Response ──────────────────────────────────────────────────────────────

    pub fn status(&mut self, code: u16) -> &mut Self {
        self.response.status = code;
        self
    }

    pub fn response_status(&self) -> u16 { self.response.status }

    /// Sets a response header, replacing existing values.
    pub fn set(&mut self, name: &str, value: &str) -> &mut Self {
        self.response.set_header(name, value);
        self
    }

    /// Adds a response header value, keeping existing ones.
    pub fn append(&mut self, name: &str, value: &str) -> &mut Self {
        self.response.append_header(name, value);
        self
    }

    pub fn response_headers(&self) -> &HeaderMap { &self.response.headers }

    /// The response body buffer. Writes append to it.
    pub fn body_writer(&mut self) -> &mut Vec<u8> { &mut self.response.body }

    /// Replaces the body with `body` typed as `content_type`.
    pub fn send(&mut self, content_type: ContentType, body: impl Into<Vec<u8>>) {
        self.response.set_body(content_type.as_str(), body.into());
    }

    /// `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: impl Into<String>) {
        self.send(ContentType::Text, body.into().into_bytes());
    }

    /// Serialises `value` as an `application/json` body.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value)?;
        self.send(ContentType::Json, body);
        Ok(())
    }

    pub(crate) fn apply_error(&mut self, err: &Error) {
        self.response.status = err.status_code().as_u16();
        self.text(err.to_string());
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
