//! API handlers.

pub mod media;
