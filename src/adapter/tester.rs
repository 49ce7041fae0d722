//! In-process request simulation for [`Api::serve_http`](crate::api::Api::serve_http).

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::Full;

use crate::error::Error;
use crate::router::Router;

/// In-process request simulation.
pub trait RequestTester: Send + Sync {
    /// Runs `req` through the app. `ms_timeout` of `None` keeps the router's
    /// default; `Some(0)` waits indefinitely.
    fn test(
        &self,
        req: http::Request<Full<Bytes>>,
        ms_timeout: Option<u64>,
    ) -> BoxFuture<'_, Result<http::Response<Full<Bytes>>, Error>>;
}

/// [`RequestTester`] backed by [`Router::test`].
pub struct RouterTester {
    app: Router,
}

impl RouterTester {
    pub fn new(app: Router) -> Self {
        Self { app }
    }
}

impl RequestTester for RouterTester {
    fn test(
        &self,
        req: http::Request<Full<Bytes>>,
        ms_timeout: Option<u64>,
    ) -> BoxFuture<'_, Result<http::Response<Full<Bytes>>, Error>> {
        let timeout = ms_timeout.map(Duration::from_millis);
        Box::pin(self.app.test(req, timeout))
    }
}
