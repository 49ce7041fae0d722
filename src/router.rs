//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A route owns a chain of
//! handlers; global middleware runs in front of every chain. Route paths
//! use `:name` segments for parameters.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use matchit::Router as MatchitRouter;
use parking_lot::RwLock;
use tracing::debug;

use crate::body::{BodyStream, RawBody, RequestBody};
use crate::ctx::{ConnInfo, Ctx, Parts};
use crate::error::{BoxError, Error};
use crate::handler::BoxedHandler;
use crate::response::Response;
use crate::scope::{CancelOnDrop, Scope};

/// Timeout applied by [`Router::test`] when the caller gives none.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(1);

// ── Config ────────────────────────────────────────────────────────────────────

/// Router settings, fixed at construction.
#[derive(Clone, Debug)]
pub struct Config {
    /// Hand handlers the live request body instead of collecting it first.
    ///
    /// With streaming on, `body_limit` is not enforced: the handler decides
    /// how much to read.
    pub stream_request_body: bool,
    /// Largest buffered body accepted, in bytes. Larger bodies get `413`.
    pub body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { stream_request_body: false, body_limit: 4 * 1024 * 1024 }
    }
}

// ── Routes ────────────────────────────────────────────────────────────────────

/// Anything routes can be registered on: the [`Router`] itself or a
/// prefix-mounted [`Group`].
///
/// Every method returns `&Self` so registrations chain.
pub trait Routes {
    /// Registers `handler` for each of `methods` on `path`. Registering the
    /// same method and path again appends to that route's chain.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with another one.
    fn add(&self, methods: &[Method], path: &str, handler: BoxedHandler) -> &Self;

    fn get(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::GET], path, handler)
    }

    fn post(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::POST], path, handler)
    }

    fn put(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::PUT], path, handler)
    }

    fn delete(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::DELETE], path, handler)
    }

    fn patch(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::PATCH], path, handler)
    }

    fn head(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::HEAD], path, handler)
    }

    fn options(&self, path: &str, handler: BoxedHandler) -> &Self {
        self.add(&[Method::OPTIONS], path, handler)
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// The application router.
///
/// A cheap-to-clone handle: clones share one route table. Register routes at
/// startup, then hand a clone to [`Server::serve`](crate::Server::serve).
///
/// ```rust,no_run
/// use tsu_bridge::{Router, Routes, handler_fn};
///
/// let app = Router::new();
/// app.get("/users/:id", handler_fn(|c| Box::pin(async move {
///     let id = c.params("id").to_owned();
///     c.text(id);
///     Ok(())
/// })));
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

struct Inner {
    config: Arc<Config>,
    table: RwLock<RouteTable>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let inner = Inner { config: Arc::new(config), table: RwLock::new(RouteTable::default()) };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Adds a handler that runs in front of every route, in registration
    /// order. It must call [`Ctx::next`] to continue the chain.
    pub fn middleware(&self, handler: BoxedHandler) -> &Self {
        self.inner.table.write().middleware.push(handler);
        self
    }

    /// A view that registers routes below `prefix`.
    pub fn group(&self, prefix: &str) -> Group {
        Group { app: self.clone(), prefix: prefix.trim_end_matches('/').to_owned() }
    }

    /// Routes one request through the handler chain and produces the response.
    ///
    /// Used by [`Server`](crate::Server) for every connection. Call it
    /// directly when accepting connections yourself, e.g. behind a TLS
    /// acceptor that fills in [`ConnInfo::with_tls`].
    pub fn dispatch<B>(
        &self,
        req: http::Request<B>,
        conn: ConnInfo,
    ) -> impl Future<Output = http::Response<Full<Bytes>>> + Send + '_
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (request, body) = req.into_parts();
        self.dispatch_raw(request, body.map_err(Into::into).boxed_unsync(), conn)
    }

    async fn dispatch_raw(
        &self,
        request: http::request::Parts,
        body: RawBody,
        conn: ConnInfo,
    ) -> http::Response<Full<Bytes>> {
        let config = Arc::clone(&self.inner.config);

        let body = if config.stream_request_body {
            RequestBody::Streaming(BodyStream::new(body))
        } else {
            let collecting: BoxFuture<'static, _> =
                Box::pin(Limited::new(body, config.body_limit).collect());
            match collecting.await {
                Ok(collected) => RequestBody::Buffered(collected.to_bytes()),
                Err(e) if e.is::<http_body_util::LengthLimitError>() => {
                    return Response::with_status(StatusCode::PAYLOAD_TOO_LARGE).into_http();
                }
                Err(e) => {
                    debug!(error = %e, "failed to read request body");
                    return Response::with_status(StatusCode::BAD_REQUEST).into_http();
                }
            }
        };

        let resolved = self.inner.table.read().resolve(&request.method, request.uri.path());

        let scope = Scope::new();
        let _guard = CancelOnDrop(scope.clone());
        let mut ctx = Ctx::new(Parts {
            config,
            request,
            conn,
            body,
            route: resolved.route,
            params: resolved.params,
            scope,
            chain: resolved.chain,
        });

        if let Err(e) = ctx.next().await {
            debug!(method = ctx.method(), path = ctx.path(), error = %e, "handler chain failed");
            ctx.apply_error(&e);
        }
        ctx.into_response().into_http()
    }

    /// Runs a request through the app in-process, without a socket.
    ///
    /// `timeout` defaults to [`DEFAULT_TEST_TIMEOUT`]; `Some(Duration::ZERO)`
    /// waits indefinitely. A panic in an unprotected handler propagates to
    /// the caller.
    pub fn test<B>(
        &self,
        req: http::Request<B>,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<http::Response<Full<Bytes>>, Error>> + Send + '_
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (request, body) = req.into_parts();
        self.test_raw(request, body.map_err(Into::into).boxed_unsync(), timeout)
    }

    async fn test_raw(
        &self,
        request: http::request::Parts,
        body: RawBody,
        timeout: Option<Duration>,
    ) -> Result<http::Response<Full<Bytes>>, Error> {
        let fut = self.dispatch_raw(request, body, ConnInfo::simulated());
        let limit = timeout.unwrap_or(DEFAULT_TEST_TIMEOUT);
        if limit.is_zero() {
            return Ok(fut.await);
        }
        tokio::time::timeout(limit, fut).await.map_err(|_| Error::Timeout(limit))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Routes for Router {
    fn add(&self, methods: &[Method], path: &str, handler: BoxedHandler) -> &Self {
        let mut table = self.inner.table.write();
        for method in methods {
            table.insert(method.clone(), path, Arc::clone(&handler));
        }
        self
    }
}

// ── Group ─────────────────────────────────────────────────────────────────────

/// Registers routes on a [`Router`] below a fixed path prefix.
#[derive(Clone)]
pub struct Group {
    app: Router,
    prefix: String,
}

impl Group {
    pub fn prefix(&self) -> &str { &self.prefix }

    /// A nested group below this one.
    pub fn group(&self, prefix: &str) -> Group {
        self.app.group(&self.join(prefix))
    }

    fn join(&self, path: &str) -> String {
        match path.trim_start_matches('/') {
            "" if self.prefix.is_empty() => "/".to_owned(),
            "" => self.prefix.clone(),
            rest => format!("{}/{rest}", self.prefix),
        }
    }
}

impl Routes for Group {
    fn add(&self, methods: &[Method], path: &str, handler: BoxedHandler) -> &Self {
        self.app.add(methods, &self.join(path), handler);
        self
    }
}

// ── Route table ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct RouteTable {
    middleware: Vec<BoxedHandler>,
    trees: HashMap<Method, MatchitRouter<usize>>,
    routes: Vec<Route>,
    by_key: HashMap<(Method, String), usize>,
}

struct Route {
    path: Arc<str>,
    handlers: Vec<BoxedHandler>,
}

struct Resolved {
    route: Option<Arc<str>>,
    params: Vec<(String, String)>,
    chain: Vec<BoxedHandler>,
}

impl RouteTable {
    fn insert(&mut self, method: Method, path: &str, handler: BoxedHandler) {
        let key = (method.clone(), path.to_owned());
        if let Some(&idx) = self.by_key.get(&key) {
            self.routes[idx].handlers.push(handler);
            debug!(%method, path, "appended handler to route");
            return;
        }

        let idx = self.routes.len();
        self.trees
            .entry(method.clone())
            .or_default()
            .insert(matchit_path(path), idx)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.routes.push(Route { path: Arc::from(path), handlers: vec![handler] });
        self.by_key.insert(key, idx);
        debug!(%method, path, "registered route");
    }

    fn resolve(&self, method: &Method, path: &str) -> Resolved {
        let mut chain = self.middleware.clone();
        let matched = self.trees.get(method).and_then(|tree| tree.at(path).ok());
        let Some(matched) = matched else {
            return Resolved { route: None, params: Vec::new(), chain };
        };

        let route = &self.routes[*matched.value];
        chain.extend(route.handlers.iter().cloned());
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Resolved { route: Some(Arc::clone(&route.path)), params, chain }
    }
}

/// Rewrites `:name` parameters into matchit's `{name}` syntax.
///
/// A name ends at the first character outside `[A-Za-z0-9_]`, so static text
/// after it stays in the segment: `/files/:name.json` → `/files/{name}.json`.
///
/// # Panics
///
/// When one segment holds two parameters, e.g. `/range/:from-:to`. matchit
/// cannot tell where the first value ends.
fn matchit_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let Some((head, rest)) = segment.split_once(':') else {
                return segment.to_owned();
            };
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let (name, tail) = rest.split_at(end);
            if tail.contains(':') {
                panic!("invalid route `{path}`: segment `{segment}` holds more than one parameter");
            }
            format!("{head}{{{name}}}{tail}")
        })
        .collect::<Vec<_>>()
        .join("/")
}
