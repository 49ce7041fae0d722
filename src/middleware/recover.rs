//! Panic recovery.
//!
//! A panic inside a handler would otherwise unwind through hyper and drop the
//! connection. [`recover`] catches it and answers with a fixed JSON `500`.
//! The panic payload is discarded: nothing about it reaches the client and
//! nothing is logged here.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use http::StatusCode;
use serde::Serialize;

use crate::handler::{BoxedHandler, handler_fn};

/// Exact body written after a recovered panic.
pub const INTERNAL_SERVER_ERROR_BODY: &str = r#"{"message":"internal server error"}"#;

#[derive(Serialize)]
struct ErrorBody {
    message: &'static str,
}

/// Middleware that turns a panic anywhere downstream into
/// `500 application/json` with body `{"message":"internal server error"}`.
///
/// Register it first so it wraps everything after it:
///
/// ```rust
/// use tsu_bridge::{Router, middleware};
///
/// let app = Router::new();
/// app.middleware(middleware::recover());
/// ```
///
/// Errors returned (not panicked) by downstream handlers pass through.
pub fn recover() -> BoxedHandler {
    handler_fn(|c| Box::pin(async move {
        let outcome = AssertUnwindSafe(c.next()).catch_unwind().await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                c.status(StatusCode::INTERNAL_SERVER_ERROR.as_u16())
                    .json(&ErrorBody { message: "internal server error" })
            }
        }
    }))
}
