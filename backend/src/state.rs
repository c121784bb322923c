//! Application state management.

use crate::server::ServerConfig;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Whether served files carry cache validators.
    pub fn enable_caching(&self) -> bool {
        self.config.enable_caching
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
