//! Request scope: cancellation plus an immutable chain of values.
//!
//! A [`Scope`] is what a handler consults for "ambient" request data that did
//! not come off the wire: values attached by middleware, and a signal telling
//! it the request is over. Deriving a child with [`Scope::with_value`] never
//! mutates the parent; children share the parent's cancellation state.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use tokio::sync::Notify;

/// A shared, type-erased value stored in a scope or in the locals of a `Ctx`.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Read-only view of a request scope.
///
/// Implemented by [`Scope`] and by the merged view the API adapter hands out.
pub trait ValueScope: Send + Sync {
    /// Looks up `key`, returning `None` when no value is attached.
    fn value(&self, key: &str) -> Option<Value>;

    fn is_cancelled(&self) -> bool;

    /// Resolves once the scope is cancelled.
    fn done(&self) -> BoxFuture<'_, ()>;
}

/// Cancellation and value context for one request.
#[derive(Clone)]
pub struct Scope {
    values: Option<Arc<Node>>,
    cancel: Arc<CancelState>,
}

struct Node {
    key: String,
    value: Value,
    parent: Option<Arc<Node>>,
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Scope {
    /// An empty scope with a fresh cancellation state.
    pub fn new() -> Self {
        Self { values: None, cancel: Arc::default() }
    }

    /// Derives a child scope carrying `key`. A later key shadows an earlier one.
    pub fn with_value(&self, key: impl Into<String>, value: impl Any + Send + Sync) -> Self {
        let node = Node {
            key: key.into(),
            value: Arc::new(value),
            parent: self.values.clone(),
        };
        Self { values: Some(Arc::new(node)), cancel: Arc::clone(&self.cancel) }
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        let mut node = self.values.as_deref();
        while let Some(n) = node {
            if n.key == key {
                return Some(Arc::clone(&n.value));
            }
            node = n.parent.as_deref();
        }
        None
    }

    /// Typed lookup. Returns `None` on a miss or a type mismatch.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.value(key).and_then(|v| v.downcast::<T>().ok())
    }

    /// Cancels this scope and every scope derived from it.
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.cancelled.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent `cancel` is not missed.
            let notified = self.cancel.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for Scope {
    fn default() -> Self { Self::new() }
}

impl ValueScope for Scope {
    fn value(&self, key: &str) -> Option<Value> {
        Scope::value(self, key)
    }

    fn is_cancelled(&self) -> bool {
        Scope::is_cancelled(self)
    }

    fn done(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.cancelled())
    }
}

/// Cancels the wrapped scope when dropped: on completion or when hyper drops
/// the request future after a disconnect.
pub(crate) struct CancelOnDrop(pub(crate) Scope);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
