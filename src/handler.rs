//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A route holds a *chain* of handlers of different concrete types, so every
//! handler is erased behind [`ErasedHandler`] and shared as a
//! [`BoxedHandler`] (`Arc<dyn ErasedHandler>`).
//!
//! Handlers borrow the per-request [`Ctx`] instead of owning it. The borrow
//! lives exactly as long as the returned future, which is what lets the
//! router reuse the context after the handler returns and keeps anyone from
//! holding on to it:
//!
//! ```text
//! handler_fn(|c| Box::pin(async move { … }))   ← user writes this
//!        ↓
//! Arc::new(FnHandler(f))                       ← BoxedHandler
//!        ↓
//! handler.call(&mut ctx)  at request time      ← one vtable dispatch
//!        ↓
//! BoxFuture<'c, Result<(), Error>>             ← borrows ctx for 'c
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::ctx::Ctx;
use crate::error::Error;

/// Result type every handler resolves to.
pub type HandlerResult = Result<(), Error>;

/// Internal dispatch interface.
///
/// Implement it directly when a handler needs state that a closure would
/// have to clone on every call.
pub trait ErasedHandler {
    fn call<'c>(&self, ctx: &'c mut Ctx) -> BoxFuture<'c, HandlerResult>;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Wraps a closure into a [`BoxedHandler`].
///
/// The `Fn` bound sits on this function (not on a helper trait) so the
/// compiler can infer the closure's higher-ranked signature:
///
/// ```rust
/// use tsu_bridge::handler_fn;
///
/// let hello = handler_fn(|c| Box::pin(async move {
///     c.text("hello");
///     Ok(())
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> BoxedHandler
where
    F: for<'c> Fn(&'c mut Ctx) -> BoxFuture<'c, HandlerResult> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Newtype bridging a closure to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: for<'c> Fn(&'c mut Ctx) -> BoxFuture<'c, HandlerResult> + Send + Sync,
{
    fn call<'c>(&self, ctx: &'c mut Ctx) -> BoxFuture<'c, HandlerResult> {
        (self.0)(ctx)
    }
}
