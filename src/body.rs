//! Request bodies: buffered or live.
//!
//! Which one a handler sees is decided by
//! [`Config::stream_request_body`](crate::Config::stream_request_body), never
//! by the request itself.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Instant;

use bytes::Bytes;
use futures::Stream;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Body;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

use crate::error::BoxError;

/// Body type every request is normalised to before dispatch.
pub(crate) type RawBody = UnsyncBoxBody<Bytes, BoxError>;

pub(crate) enum RequestBody {
    /// Collected in full before the chain ran.
    Buffered(Bytes),
    /// Still arriving from the connection.
    Streaming(BodyStream),
}

/// A request body read live from the connection.
///
/// Implements both [`AsyncRead`] and [`Stream`]. Once a read deadline is set,
/// any read that would have to wait for the connection after that instant
/// fails with [`io::ErrorKind::TimedOut`]. Bytes that already arrived are
/// still handed out.
pub struct BodyStream {
    body: RawBody,
    pending: Bytes,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl BodyStream {
    pub(crate) fn new(body: RawBody) -> Self {
        Self { body, pending: Bytes::new(), deadline: None }
    }

    pub(crate) fn set_deadline(&mut self, deadline: Instant) {
        let deadline = tokio::time::Instant::from_std(deadline);
        self.deadline = Some(Box::pin(tokio::time::sleep_until(deadline)));
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        if !self.pending.is_empty() {
            return Poll::Ready(Some(Ok(std::mem::take(&mut self.pending))));
        }
        if let Some(deadline) = self.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                return Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "read deadline exceeded",
                ))));
            }
        }
        loop {
            match ready!(Pin::new(&mut self.body).poll_frame(cx)) {
                Some(Ok(frame)) => {
                    // Trailers carry no body bytes.
                    if let Ok(data) = frame.into_data() {
                        if !data.is_empty() {
                            return Poll::Ready(Some(Ok(data)));
                        }
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(io::Error::other(e)))),
                None => return Poll::Ready(None),
            }
        }
    }
}

impl Stream for BodyStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx)
    }
}

impl AsyncRead for BodyStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.pending.is_empty() {
            match ready!(this.poll_chunk(cx)) {
                Some(Ok(chunk)) => this.pending = chunk,
                Some(Err(e)) => return Poll::Ready(Err(e)),
                None => return Poll::Ready(Ok(())),
            }
        }
        let n = buf.remaining().min(this.pending.len());
        buf.put_slice(&this.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}
