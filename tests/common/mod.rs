#![allow(dead_code)]

use std::convert::Infallible;

use bytes::Bytes;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use http::{Method, Request};
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use tsu_bridge::api;

pub type ChannelBody = StreamBody<futures::stream::Map<
    futures::channel::mpsc::UnboundedReceiver<Bytes>,
    fn(Bytes) -> Result<Frame<Bytes>, Infallible>,
>>;

pub fn config() -> api::Config {
    api::Config::new("Test API", "1.0.0")
}

pub fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// A request whose body arrives chunk by chunk through the returned sender.
pub fn channel_request(uri: &str) -> (UnboundedSender<Bytes>, Request<ChannelBody>) {
    let (tx, rx) = unbounded::<Bytes>();
    let frame: fn(Bytes) -> Result<Frame<Bytes>, Infallible> = |b| Ok(Frame::data(b));
    let req = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(StreamBody::new(rx.map(frame)))
        .unwrap();
    (tx, req)
}

pub async fn body_string(res: http::Response<Full<Bytes>>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
