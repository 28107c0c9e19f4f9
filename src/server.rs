//! A single-handler HTTP server with graceful shutdown.
//!
//! One server serves one [`HandlerService`]. There is no routing: put a
//! router in front, or dispatch inside the handler.
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Closes idle keep-alive connections and lets every in-flight request
//!    run to completion.
//! 3. Returns from [`Server::serve`].

use std::future::Future;
use std::net::SocketAddr;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

use crate::error::Error;
use crate::handler::HandlerService;

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Server {
    /// Binds a listener on `addr`: a `SocketAddr`, or a `host:port` string
    /// that is resolved first (`"localhost:3000"` works).
    ///
    /// Port `0` picks a free port; read it back with
    /// [`local_addr`](Server::local_addr).
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if `addr` does not resolve or the bind fails.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `service` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, service: HandlerService) -> Result<(), Error> {
        self.serve_with_shutdown(service, shutdown_signal()).await
    }

    /// Serves `service` until `signal` resolves, then drains in-flight
    /// connections before returning.
    pub async fn serve_with_shutdown<F>(self, service: HandlerService, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let Self { listener, addr } = self;
        info!(%addr, "courier listening");

        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
        let builder = ConnBuilder::new(TokioExecutor::new());
        // Tracks every connection so shutdown can tell idle keep-alive
        // connections to close and wait for busy ones to finish.
        let graceful = GracefulShutdown::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even when more
                // connections are queued.
                biased;

                () = &mut signal => {
                    info!("shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let conn = builder.serve_connection(TokioIo::new(stream), service.clone());
                    let conn = graceful.watch(conn.into_owned());

                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }
            }
        }

        drop(listener);
        graceful.shutdown().await;

        info!("courier stopped");
        Ok(())
    }
}

/// Resolves on SIGTERM (Unix) or Ctrl-C. A signal that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
