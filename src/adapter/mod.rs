//! Runs the generic [`api`](crate::api) layer on the tsu router.
//!
//! [`new`] and [`new_with_group`] build an [`Api`] whose operations are
//! registered as tsu routes. Each request reaches the API handler as a
//! [`TsuContext`], a [`Context`] that forwards to the native [`Ctx`].
//!
//! The native context is borrowed, never owned. [`unwrap`] hands it back to
//! code that needs router-specific features; the returned reference cannot
//! outlive the handler call.

mod context;
mod routes;
mod tester;

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};

use crate::api::{self, Adapter, Api, ApiHandler, Context, Operation};
use crate::ctx::Ctx;
use crate::handler::{BoxedHandler, ErasedHandler, HandlerResult};
use crate::router::{Group, Router, Routes};

pub use context::{MergedScope, TsuContext};
pub use routes::RouterAdapter;
pub use tester::{RequestTester, RouterTester};

/// [`Adapter`] for the tsu router.
pub struct TsuAdapter<R> {
    tester: Box<dyn RequestTester>,
    router: RouterAdapter<R>,
}

impl<R: Routes> TsuAdapter<R> {
    pub fn new(tester: impl RequestTester + 'static, router: R) -> Self {
        Self { tester: Box::new(tester), router: RouterAdapter::new(router) }
    }
}

/// An API whose routes are registered directly on `app`.
pub fn new(app: &Router, config: api::Config) -> Api<TsuAdapter<Router>> {
    Api::new(config, TsuAdapter::new(RouterTester::new(app.clone()), app.clone()))
}

/// An API whose routes are registered on `group`. Requests simulated through
/// [`Api::serve_http`] still enter through `app`.
pub fn new_with_group(app: &Router, group: Group, config: api::Config) -> Api<TsuAdapter<Group>> {
    Api::new(config, TsuAdapter::new(RouterTester::new(app.clone()), group))
}

/// The native [`Ctx`] behind a context produced by this adapter.
///
/// # Panics
///
/// Panics with `"not a tsu context"` when `ctx` comes from another adapter.
/// That is a programming error, not a runtime condition.
pub fn unwrap<'a>(ctx: &'a mut dyn Context) -> &'a mut Ctx {
    match ctx.native_mut().downcast_mut::<Ctx>() {
        Some(native) => native,
        None => panic!("not a tsu context"),
    }
}

impl<R: Routes + Send + Sync> Adapter for TsuAdapter<R> {
    fn handle(&mut self, op: Arc<Operation>, handler: ApiHandler) {
        let path = routes::router_path(&op.path);
        let method = op.method.clone();
        let route: BoxedHandler = Arc::new(OperationHandler { op, handler });
        self.router.add(&method, &path, [route]);
    }

    fn serve_http(&self, req: http::Request<Full<Bytes>>) -> BoxFuture<'_, http::Response<Full<Bytes>>> {
        Box::pin(async move {
            let resp = match self.tester.test(req, None).await {
                Ok(resp) => resp,
                Err(e) => panic!("request simulation failed: {e}"),
            };

            let (parts, body) = resp.into_parts();
            let mut out = http::Response::builder().status(parts.status);
            if let Some(headers) = out.headers_mut() {
                for (name, value) in &parts.headers {
                    headers.append(name, value.clone());
                }
            }
            // `Full` cannot fail; the error type is `Infallible`.
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            match out.body(Full::new(bytes)) {
                Ok(resp) => resp,
                Err(e) => panic!("rebuilding simulated response failed: {e}"),
            }
        })
    }
}

/// The tsu route registered for one operation: wraps the native context and
/// hands it to the API handler.
struct OperationHandler {
    op: Arc<Operation>,
    handler: ApiHandler,
}

impl ErasedHandler for OperationHandler {
    fn call<'c>(&self, ctx: &'c mut Ctx) -> BoxFuture<'c, HandlerResult> {
        let op = Arc::clone(&self.op);
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            let mut wrapped = TsuContext::new(op, ctx);
            let ctx: &mut dyn Context = &mut wrapped;
            handler(ctx).await;
            Ok(())
        })
    }
}
