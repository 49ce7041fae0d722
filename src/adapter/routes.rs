//! Route registration: `{param}` paths onto tsu's `:param` routes.

use http::Method;

use crate::handler::BoxedHandler;
use crate::router::Routes;

/// Translates generic `(method, path, handlers)` registrations into calls on
/// a tsu [`Routes`] target: the whole app or a group.
pub struct RouterAdapter<R> {
    router: R,
}

impl<R: Routes> RouterAdapter<R> {
    pub fn new(router: R) -> Self {
        Self { router }
    }

    /// Registers `handlers` in order. Standard methods go through their
    /// dedicated function; anything else through [`Routes::add`].
    pub fn add(&self, method: &Method, path: &str, handlers: impl IntoIterator<Item = BoxedHandler>) -> &R {
        let router = &self.router;
        for handler in handlers {
            match *method {
                Method::GET     => router.get(path, handler),
                Method::POST    => router.post(path, handler),
                Method::PUT     => router.put(path, handler),
                Method::DELETE  => router.delete(path, handler),
                Method::PATCH   => router.patch(path, handler),
                Method::HEAD    => router.head(path, handler),
                Method::OPTIONS => router.options(path, handler),
                _               => router.add(std::slice::from_ref(method), path, handler),
            };
        }
        router
    }
}

/// Rewrites `{name}` parameters into tsu's `:name` form.
///
/// A plain character substitution: every `{` becomes `:` and every `}` is
/// dropped. Literal braces in a path are not supported and come out mangled.
pub(crate) fn router_path(path: &str) -> String {
    path.replace('{', ":").replace('}', "")
}
