//! Locator server listener
//!
//! Handles the TCP accept loop, upgrades connections to WebSocket and spawns a
//! subscriber session per connection. Also owns the broadcast engine task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::engine::BroadcastEngine;
use crate::error::{Error, ProtocolError, Result};
use crate::feed::Feed;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::session::SubscriberSession;
use crate::snapshot::SnapshotStore;
use crate::stats::{ServerMetrics, ServerStats};
use crate::transport::WebSocketTransport;

/// Locator server
pub struct LocatorServer<F: Feed> {
    config: ServerConfig,
    engine: Arc<BroadcastEngine<F>>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    metrics: Arc<ServerMetrics>,
}

impl<F: Feed> LocatorServer<F> {
    /// Create a new server with the given configuration and feed
    pub fn new(config: ServerConfig, feed: F) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let engine = Arc::new(BroadcastEngine::new(feed, config.engine.clone()));

        Self {
            config,
            engine,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            metrics: Arc::new(ServerMetrics::new()),
        }
    }

    /// Get the broadcast engine
    pub fn engine(&self) -> &Arc<BroadcastEngine<F>> {
        &self.engine
    }

    /// Get the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        self.engine.registry()
    }

    /// Get the snapshot store
    pub fn store(&self) -> &Arc<SnapshotStore> {
        self.engine.store()
    }

    /// Current server statistics
    pub fn stats(&self) -> ServerStats {
        self.metrics.snapshot(self.engine.registry().len(), self.engine.stats())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address
    ///
    /// This is the only failure that stops the server.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.bind_addr,
                source,
            })
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown the refresh loop is stopped and every subscriber is closed, so
    /// sessions end and deregister on their own.
    pub async fn serve<S>(&self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Locator server listening");

        let engine_handle = self.engine.spawn();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        // Stop refreshing, then release every session
        engine_handle.abort();
        self.engine.registry().close_all();

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.metrics.connection_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        // Generate session ID
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(session_id = session_id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let timeout = self.config.handshake_timeout;
        let registry = Arc::clone(self.engine.registry());
        let store = Arc::clone(self.engine.store());
        let metrics = Arc::clone(&self.metrics);
        metrics.connection_opened();

        tokio::spawn(async move {
            let _permit = permit;

            let transport = match tokio::time::timeout(timeout, WebSocketTransport::accept(socket))
                .await
            {
                Ok(Ok(transport)) => Some(transport),
                Ok(Err(e)) => {
                    tracing::debug!(
                        session_id = session_id,
                        error = %e,
                        "WebSocket handshake failed"
                    );
                    None
                }
                Err(_) => {
                    tracing::debug!(session_id = session_id, "WebSocket handshake timed out");
                    None
                }
            };

            if let Some(transport) = transport {
                let session =
                    SubscriberSession::new(session_id, peer_addr, transport, registry, store)
                        .filter_timeout(timeout);

                match session.run().await {
                    Ok(reason) => {
                        tracing::debug!(session_id = session_id, reason = ?reason, "Session ended");
                    }
                    Err(ProtocolError::Closed) => {
                        tracing::debug!(session_id = session_id, "Peer left before subscribing");
                    }
                    Err(e) => {
                        tracing::info!(
                            session_id = session_id,
                            peer = %peer_addr,
                            error = %e,
                            "Session terminated"
                        );
                    }
                }
            }

            metrics.connection_closed();
            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}
