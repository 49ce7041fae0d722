//! # tsu-bridge
//!
//! Runs a schema-driven, transport-agnostic API layer on the tsu router.
//!
//! Two sides meet here:
//!
//! - the **router**: [`Router`], [`Ctx`] and [`Server`]. Radix-tree routing
//!   via [`matchit`], hyper for HTTP/1.1 and HTTP/2, handler chains with
//!   middleware, per-request locals, buffered or streamed bodies, and
//!   in-process simulation with [`Router::test`];
//! - the **API layer**: [`api::Api`], [`api::Operation`] and the
//!   [`api::Context`] trait every API handler is written against.
//!
//! [`adapter`] joins them: operations become tsu routes (`{id}` → `:id`) and
//! each request reaches its API handler as a borrowed [`api::Context`].
//! [`middleware::recover`] turns handler panics into a fixed JSON `500`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::io::Write;
//! use http::Method;
//! use tsu_bridge::{Router, Server, adapter, api, middleware};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new();
//!     app.middleware(middleware::recover());
//!
//!     let mut api = adapter::new(&app, api::Config::new("Widgets", "1.0.0"));
//!     api.register(api::Operation::new(Method::GET, "/widgets/{id}"), |ctx| Box::pin(async move {
//!         let body = format!(r#"{{"id":"{}"}}"#, ctx.param("id"));
//!         ctx.set_header("content-type", "application/json");
//!         let _ = ctx.body_writer().write_all(body.as_bytes());
//!     }));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```

mod body;
mod ctx;
mod error;
mod form;
mod handler;
mod response;
mod router;
mod scope;
mod server;

pub mod adapter;
pub mod api;
pub mod middleware;

pub use body::BodyStream;
pub use ctx::{ConnInfo, Ctx, TlsInfo};
pub use error::{BoxError, Error};
pub use form::{FormFile, MultipartForm};
pub use handler::{BoxedHandler, ErasedHandler, HandlerResult, handler_fn};
pub use response::ContentType;
pub use router::{Config, DEFAULT_TEST_TIMEOUT, Group, Router, Routes};
pub use scope::{Scope, Value, ValueScope};
pub use server::Server;
