//! Local media embedding.
//!
//! Resolves local paths and links into player markup for notes, expands
//! directory references, and serves local files to the host webview from a
//! loopback HTTP server.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod block;
pub mod commands;
pub mod config;
pub mod expander;
pub mod logging;
pub mod notice;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod server;
pub mod state;
pub mod timestamp;

pub use server::{MediaServer, ServerConfig, ServerError};

use state::AppState;

/// Create the Axum application router.
///
/// The only route is `GET /?q=<path>`; anything else is a `404`.
pub fn create_app(config: ServerConfig) -> Router {
    create_app_with_state(AppState::new(config))
}

/// Create the Axum application router with a given state.
pub fn create_app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::media::serve_file))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
