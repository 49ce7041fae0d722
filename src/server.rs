//! HTTP server and graceful shutdown.
//!
//! Each accepted TCP connection gets its own task. hyper-util's auto builder
//! negotiates HTTP/1.1 or HTTP/2 on it and every request is handed to
//! [`Router::dispatch`].
//!
//! When the shutdown signal fires the listener is dropped and the server
//! waits for open connections to finish before returning.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::ctx::ConnInfo;
use crate::error::Error;
use crate::router::Router;

/// Binds a listener and serves a [`Router`] on it.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Prepares a server for `addr`. Nothing is bound until
    /// [`serve`](Server::serve).
    ///
    /// # Panics
    ///
    /// When `addr` does not parse as `host:port`.
    ///
    /// ```rust,no_run
    /// use tsu_bridge::Server;
    /// let server = Server::bind("127.0.0.1:8080");
    /// ```
    pub fn bind(addr: &str) -> Self {
        match addr.parse() {
            Ok(addr) => Self { addr },
            Err(e) => panic!("invalid listen address `{addr}`: {e}"),
        }
    }

    /// Serves until SIGTERM or Ctrl-C.
    ///
    /// Clones of `router` stay usable for registration and [`Router::test`]
    /// while the server runs.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains open connections.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %listener.local_addr()?, "tsu-bridge listening");

        let mut conns = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        conns.spawn(serve_connection(router.clone(), stream, peer));
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },

                Some(_) = conns.join_next(), if !conns.is_empty() => {}
            }
        }

        drop(listener);
        info!(open = conns.len(), "shutting down, waiting for open connections");
        while conns.join_next().await.is_some() {}
        info!("tsu-bridge stopped");
        Ok(())
    }
}

async fn serve_connection(router: Router, stream: TcpStream, peer: SocketAddr) {
    debug!(%peer, "connection opened");
    let conn = ConnInfo::new(peer);
    let svc = service_fn(move |req: hyper::Request<Incoming>| {
        let router = router.clone();
        let conn = conn.clone();
        async move { Ok::<_, Infallible>(router.dispatch(req, conn).await) }
    });

    let builder = ConnBuilder::new(TokioExecutor::new());
    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
        error!(%peer, error = %e, "connection failed");
    }
}

/// Resolves on SIGTERM (Unix only) or Ctrl-C. If a handler cannot be
/// installed the failure is logged and that signal is ignored.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_once_signalled() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(
            Server::bind("127.0.0.1:0").serve_with_shutdown(Router::new(), async {
                let _ = rx.await;
            }),
        );

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test]
    #[should_panic(expected = "invalid listen address")]
    fn bind_rejects_garbage() {
        Server::bind("not an address");
    }
}
