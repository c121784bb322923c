//! Shared types for the Local Media note extension.
//!
//! This crate contains the media data model shared between the resolver,
//! renderer and server components.

/// Default port for the loopback media server.
pub const DEFAULT_PORT: u16 = 5555;

/// Default base link the rendered markup points at.
pub const DEFAULT_BASELINK: &str = "http://127.0.0.1";

/// Default player width in pixels.
pub const DEFAULT_WIDTH: u32 = 640;

/// Default player height in pixels.
pub const DEFAULT_HEIGHT: u32 = 360;

/// Default cap on the number of files a directory reference expands to.
pub const DEFAULT_MAX_EMBEDS: usize = 50;

pub mod media;

// Re-export commonly used types
pub use media::{Dimension, MediaKind, MediaReference, MediaView, ResolvedTarget};
