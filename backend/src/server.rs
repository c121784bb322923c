//! Loopback media server lifecycle.
//!
//! A [`MediaServer`] owns at most one listener. Starting binds
//! `127.0.0.1:<port>` and spawns the axum service; stopping signals a
//! graceful shutdown and waits a bounded time for the service task to
//! finish before aborting it.

use local_media_types::DEFAULT_PORT;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long `stop` waits for open responses to drain.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings the listener is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port on the loopback interface (0 picks a free port)
    pub port: u16,
    /// Send `ETag`/`Cache-Control` and honour `If-None-Match`
    pub enable_caching: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            enable_caching: true,
        }
    }
}

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Media server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("Failed to start media server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

enum ServerState {
    Stopped,
    Running {
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
}

/// The loopback file server.
pub struct MediaServer {
    config: ServerConfig,
    shutdown_timeout: Duration,
    state: ServerState,
}

impl MediaServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            state: ServerState::Stopped,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Replace the configuration. A running listener keeps its old settings
    /// until [`restart`](Self::restart).
    pub fn set_config(&mut self, config: ServerConfig) {
        self.config = config;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ServerState::Running { .. })
    }

    /// Address of the live listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            ServerState::Running { addr, .. } => Some(*addr),
            ServerState::Stopped => None,
        }
    }

    /// Bind the listener and start serving.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let ServerState::Running { addr, .. } = &self.state {
            return Err(ServerError::AlreadyRunning(*addr));
        }

        let port = self.config.port;
        let bind_err = |source| ServerError::Bind { port, source };
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
            .await
            .map_err(bind_err)?;
        let addr = listener.local_addr().map_err(bind_err)?;

        let app = crate::create_app(self.config.clone());
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let shutdown_signal = async move {
                shutdown_rx.await.ok();
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal)
                .await
            {
                error!("Media server error: {}", e);
            }
        });

        info!("Media server listening on http://{}", addr);
        self.state = ServerState::Running {
            addr,
            shutdown,
            task,
        };
        Ok(addr)
    }

    /// Shut the listener down. In-flight requests get the shutdown timeout
    /// to finish; a client that stops reading does not hold `stop` up.
    /// No-op when stopped.
    pub async fn stop(&mut self) {
        let ServerState::Running {
            addr,
            shutdown,
            mut task,
        } = std::mem::replace(&mut self.state, ServerState::Stopped)
        else {
            return;
        };

        shutdown.send(()).ok();
        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Media server task ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Media server on {} did not drain within {:?}, aborting",
                    addr, self.shutdown_timeout
                );
                task.abort();
            }
        }
        info!("Media server on {} stopped", addr);
    }

    /// Stop (if running) and start again with the current configuration.
    pub async fn restart(&mut self) -> Result<SocketAddr, ServerError> {
        self.stop().await;
        self.start().await
    }

    /// Start a stopped server or stop a running one. Returns whether the
    /// server is running afterwards.
    pub async fn toggle(&mut self) -> Result<bool, ServerError> {
        if self.is_running() {
            self.stop().await;
            Ok(false)
        } else {
            self.start().await.map(|_| true)
        }
    }
}

impl Drop for MediaServer {
    fn drop(&mut self) {
        if let ServerState::Running { shutdown, .. } =
            std::mem::replace(&mut self.state, ServerState::Stopped)
        {
            shutdown.send(()).ok();
        }
    }
}
