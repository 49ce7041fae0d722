//! [`Context`] implementation over the native [`Ctx`], and the merged
//! value scope it hands out.

use std::any::Any;
use std::borrow::Cow;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use http::Uri;
use tokio::io::AsyncRead;

use crate::api::{Context, Operation, ProtoVersion};
use crate::ctx::{Ctx, TlsInfo};
use crate::error::Error;
use crate::form::MultipartForm;
use crate::scope::{Scope, Value, ValueScope};

/// [`Context`] over a borrowed tsu [`Ctx`].
///
/// Lives only inside the route handler the adapter registers; the borrow of
/// the native context ends with it.
pub struct TsuContext<'c> {
    op: Arc<Operation>,
    status: u16,
    orig: &'c mut Ctx,
}

impl<'c> TsuContext<'c> {
    pub(crate) fn new(op: Arc<Operation>, orig: &'c mut Ctx) -> Self {
        let status = orig.response_status();
        Self { op, status, orig }
    }
}

impl Context for TsuContext<'_> {
    fn operation(&self) -> &Operation { &self.op }
    fn matched(&self) -> &str { self.orig.route_path() }

    fn context(&self) -> Box<dyn ValueScope> {
        let mut locals = Vec::new();
        self.orig.visit_locals(|k, v| locals.push((k.to_owned(), Arc::clone(v))));
        Box::new(MergedScope { parent: self.orig.context().clone(), locals })
    }

    fn method(&self) -> &str { self.orig.method() }
    fn host(&self) -> &str { self.orig.hostname() }
    fn remote_addr(&self) -> String { self.orig.remote_addr().to_string() }
    fn url(&self) -> Uri { self.orig.uri().clone() }

    fn param(&self, name: &str) -> &str { self.orig.params(name) }
    fn query(&self, name: &str) -> String { self.orig.query(name) }
    fn header(&self, name: &str) -> &str { self.orig.get(name) }

    fn each_header(&self, f: &mut dyn FnMut(&str, &str)) {
        for (name, value) in self.orig.headers() {
            let value: Cow<'_, str> = String::from_utf8_lossy(value.as_bytes());
            f(name.as_str(), &value);
        }
    }

    fn body_reader(&mut self) -> Box<dyn AsyncRead + Send + Unpin + '_> {
        self.orig.body_reader()
    }

    fn get_multipart_form(&mut self) -> BoxFuture<'_, Result<MultipartForm, Error>> {
        Box::pin(self.orig.multipart_form())
    }

    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), Error> {
        self.orig.set_read_deadline(deadline)
    }

    fn set_status(&mut self, code: u16) {
        self.status = code;
        self.orig.status(code);
    }

    fn status(&self) -> u16 { self.status }

    fn set_header(&mut self, name: &str, value: &str) {
        self.orig.set(name, value);
    }

    fn append_header(&mut self, name: &str, value: &str) {
        self.orig.append(name, value);
    }

    fn body_writer(&mut self) -> &mut (dyn io::Write + Send) {
        self.orig.body_writer()
    }

    fn tls(&self) -> Option<&TlsInfo> { self.orig.tls() }
    fn version(&self) -> ProtoVersion { ProtoVersion::from(self.orig.http_version()) }

    fn native_mut(&mut self) -> &mut (dyn Any + 'static) {
        &mut *self.orig
    }
}

/// The request [`Scope`] layered over a snapshot of the `Ctx` locals.
///
/// Lookups consult the scope first and fall back to the locals, so a value
/// attached to the scope always wins over a local with the same key.
pub struct MergedScope {
    parent: Scope,
    locals: Vec<(String, Value)>,
}

impl ValueScope for MergedScope {
    fn value(&self, key: &str) -> Option<Value> {
        self.parent.value(key).or_else(|| {
            self.locals.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| Arc::clone(v))
        })
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }

    fn done(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.parent.cancelled())
    }
}
