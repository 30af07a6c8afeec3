//! Proxy server lifecycle
//!
//! A [`ProxyServer`] owns at most one listening socket. It is created from a
//! [`ServerConfig`], started and stopped explicitly by its owner, and shares no
//! state with other instances.

use crate::api::endpoints::{AppState, create_router};
use crate::core::client::UpstreamClient;
use crate::core::config::ServerConfig;
use crate::core::constants::SHUTDOWN_GRACE_SECS;
use crate::core::upstream::{Upstream, UpstreamError};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Error types for server lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Server already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

struct Running {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<io::Result<()>>,
}

/// One proxy server instance
pub struct ProxyServer {
    config: Arc<ServerConfig>,
    running: Option<Running>,
}

impl ProxyServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            running: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address actually bound, useful when the configured port is `0`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Bind the configured address and start serving with a real upstream client
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be opened, for
    /// example because the address is in use.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        let upstream = UpstreamClient::new(&self.config)?;
        self.start_with(Arc::new(upstream)).await
    }

    /// Bind the configured address and start serving against `upstream`
    pub async fn start_with(
        &mut self,
        upstream: Arc<dyn Upstream>,
    ) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning(running.local_addr));
        }

        let address = self.config.bind_address();
        let bind_error = |source| ServerError::Bind {
            address: address.clone(),
            source,
        };
        let listener = TcpListener::bind(&address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let app = create_router(AppState::new(self.config.clone(), upstream));
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
        });

        info!(
            "Server listening on http://{} (upstream {})",
            local_addr, self.config.base_url
        );

        self.running = Some(Running {
            local_addr,
            shutdown,
            handle,
        });
        Ok(local_addr)
    }

    /// Close the listening socket and wait briefly for in-flight requests
    ///
    /// Requests still running after the grace period are abandoned. Calling
    /// this on a stopped server does nothing.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        running.shutdown.cancel();
        let grace = Duration::from_secs(SHUTDOWN_GRACE_SECS);
        match tokio::time::timeout(grace, &mut running.handle).await {
            Ok(Ok(Ok(()))) => info!("Server on {} stopped", running.local_addr),
            Ok(Ok(Err(e))) => error!("Server on {} failed: {}", running.local_addr, e),
            Ok(Err(e)) => error!("Server task on {} panicked: {}", running.local_addr, e),
            Err(_) => {
                warn!(
                    "Server on {} did not drain within {}s, abandoning in-flight requests",
                    running.local_addr, SHUTDOWN_GRACE_SECS
                );
                running.handle.abort();
            }
        }
    }
}

impl Drop for ProxyServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown.cancel();
            running.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(port: u16) -> ServerConfig {
        ServerConfig::new("sk-test", "http://127.0.0.1:9/v1", "127.0.0.1", port).unwrap()
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let mut server = ProxyServer::new(local_config(0));
        server.stop().await;
        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_start_then_stop_releases_port() {
        let mut server = ProxyServer::new(local_config(0));
        let addr = server.start().await.unwrap();
        assert_eq!(server.local_addr(), Some(addr));
        assert_eq!(server.config().port, 0);
        assert_ne!(addr.port(), 0);

        server.stop().await;
        assert!(!server.is_running());
        assert!(std::net::TcpListener::bind(addr).is_ok());
    }

    #[tokio::test]
    async fn test_second_instance_on_same_port_fails() {
        let mut first = ProxyServer::new(local_config(0));
        let addr = first.start().await.unwrap();

        let mut second = ProxyServer::new(local_config(addr.port()));
        let err = second.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(!second.is_running());

        first.stop().await;
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let mut server = ProxyServer::new(local_config(0));
        let addr = server.start().await.unwrap();
        assert!(matches!(
            server.start().await,
            Err(ServerError::AlreadyRunning(a)) if a == addr
        ));
        server.stop().await;
    }
}
