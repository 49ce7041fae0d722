//! The generic API layer.
//!
//! Everything here is independent of any particular router. An [`Api`]
//! records [`Operation`]s and hands each one, together with its handler, to
//! an [`Adapter`]. The adapter owns the router-specific work: registering the
//! route and presenting each request as a [`Context`].

mod context;
mod operation;

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;
use tracing::debug;

pub use context::Context;
pub use operation::{Operation, ProtoVersion};

/// A registered API handler.
pub type ApiHandler = Arc<dyn for<'a> Fn(&'a mut dyn Context) -> BoxFuture<'a, ()> + Send + Sync>;

/// Top-level API settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub version: String,
}

impl Config {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self { title: title.into(), version: version.into() }
    }
}

/// Binds the API layer to one router.
pub trait Adapter: Send + Sync {
    /// Registers `handler` for `op` on the underlying router.
    fn handle(&mut self, op: Arc<Operation>, handler: ApiHandler);

    /// Runs one request through the router in-process and returns the
    /// complete response.
    fn serve_http(&self, req: http::Request<Full<Bytes>>) -> BoxFuture<'_, http::Response<Full<Bytes>>>;
}

/// An API bound to a router through an [`Adapter`].
pub struct Api<A> {
    config: Config,
    adapter: A,
    operations: Vec<Arc<Operation>>,
}

impl<A: Adapter> Api<A> {
    pub fn new(config: Config, adapter: A) -> Self {
        Self { config, adapter, operations: Vec::new() }
    }

    /// Registers an operation.
    ///
    /// ```rust
    /// use std::io::Write;
    /// use http::Method;
    /// use tsu_bridge::{Router, adapter, api};
    ///
    /// let app = Router::new();
    /// let mut api = adapter::new(&app, api::Config::new("Widgets", "1.0.0"));
    /// api.register(api::Operation::new(Method::GET, "/widgets/{id}"), |ctx| Box::pin(async move {
    ///     let id = ctx.param("id").to_owned();
    ///     ctx.set_header("content-type", "text/plain");
    ///     let _ = ctx.body_writer().write_all(id.as_bytes());
    /// }));
    /// ```
    pub fn register<F>(&mut self, op: Operation, handler: F)
    where
        F: for<'a> Fn(&'a mut dyn Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        debug!(method = %op.method, path = %op.path, id = %op.operation_id, "registering operation");
        self.operations.push(Arc::clone(&op));
        self.adapter.handle(op, Arc::new(handler));
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn operations(&self) -> &[Arc<Operation>] { &self.operations }

    /// See [`Adapter::serve_http`].
    pub async fn serve_http(&self, req: http::Request<Full<Bytes>>) -> http::Response<Full<Bytes>> {
        self.adapter.serve_http(req).await
    }
}
