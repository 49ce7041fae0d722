//! Middleware layer.
//!
//! Middleware is an ordinary [`BoxedHandler`](crate::BoxedHandler)
//! registered with [`Router::middleware`](crate::Router::middleware). It runs
//! in front of every route and continues the chain with
//! [`Ctx::next`](crate::Ctx::next).

mod recover;

pub use recover::{INTERNAL_SERVER_ERROR_BODY, recover};
