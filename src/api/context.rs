//! The [`Context`] trait API handlers are written against.

use std::any::Any;
use std::io;
use std::time::Instant;

use futures::future::BoxFuture;
use http::Uri;
use tokio::io::AsyncRead;

use crate::api::{Operation, ProtoVersion};
use crate::ctx::TlsInfo;
use crate::error::Error;
use crate::form::MultipartForm;
use crate::scope::ValueScope;

/// Transport-agnostic view of one request/response exchange.
///
/// API handlers only ever see this trait. Each supported router provides one
/// implementation that forwards to its native request object; handlers get
/// it as `&mut dyn Context` for the duration of the call and cannot keep it.
///
/// Readers of path, query and header values return `""` when the value is
/// absent. They never fail.
pub trait Context: Send {
    /// The operation this request was routed to.
    fn operation(&self) -> &Operation;

    /// Route pattern the router matched, in the router's own syntax.
    fn matched(&self) -> &str;

    /// Request scope for cancellation and ambient values.
    fn context(&self) -> Box<dyn ValueScope>;

    fn method(&self) -> &str;
    fn host(&self) -> &str;
    /// Peer address as `ip:port`.
    fn remote_addr(&self) -> String;
    fn url(&self) -> Uri;

    fn param(&self, name: &str) -> &str;
    fn query(&self, name: &str) -> String;
    fn header(&self, name: &str) -> &str;

    /// Calls `f` once per request header pair, in the router's storage order.
    fn each_header(&self, f: &mut dyn FnMut(&str, &str));

    fn body_reader(&mut self) -> Box<dyn AsyncRead + Send + Unpin + '_>;
    fn get_multipart_form(&mut self) -> BoxFuture<'_, Result<MultipartForm, Error>>;

    /// Bounds how long body reads may wait. Whether it has any effect depends
    /// on how the router is configured.
    fn set_read_deadline(&mut self, deadline: Instant) -> Result<(), Error>;

    fn set_status(&mut self, code: u16);
    fn status(&self) -> u16;
    fn set_header(&mut self, name: &str, value: &str);
    fn append_header(&mut self, name: &str, value: &str);
    fn body_writer(&mut self) -> &mut (dyn io::Write + Send);

    fn tls(&self) -> Option<&TlsInfo>;
    fn version(&self) -> ProtoVersion;

    /// The router-native object behind this context, for downcasting by the
    /// router's own unwrap helper.
    fn native_mut(&mut self) -> &mut (dyn Any + 'static);
}
