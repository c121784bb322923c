//! Fenced `media` block bodies.
//!
//! ```text
//! path: C:\Videos\*.mp4
//! type: video
//! width: 640
//! height: 360
//! view: grid
//! ```

use local_media_types::{Dimension, MediaReference, MediaView};
use thiserror::Error;

/// Language tag of the fenced block.
pub const BLOCK_LANGUAGE: &str = "media";

const MIN_PATH_LEN: usize = 3;

/// Errors that can occur while parsing a block body.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Invalid path provided.")]
    InvalidPath,

    #[error("Error parsing YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse a block body. Unknown keys are ignored.
pub fn parse_block(source: &str) -> Result<MediaReference, BlockError> {
    if source.trim().is_empty() {
        return Err(BlockError::InvalidPath);
    }

    let reference: MediaReference = serde_yaml::from_str(source)?;
    if reference.path.trim().chars().count() < MIN_PATH_LEN {
        return Err(BlockError::InvalidPath);
    }
    Ok(reference)
}

fn needs_quoting(value: &str) -> bool {
    value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with(|c: char| "'\"[]{}>|*&!%@,`#-?".contains(c))
}

fn yaml_scalar(value: &str) -> String {
    if needs_quoting(value) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

/// Body lines for a reference, in the order the block is usually written.
pub fn block_body(reference: &MediaReference) -> String {
    let mut body = format!("path: {}\n", yaml_scalar(&reference.path));
    if let Some(kind) = reference.kind {
        body.push_str(&format!("type: {}\n", kind));
    }
    if let Some(width) = &reference.width {
        body.push_str(&format!("width: {}\n", dimension_scalar(width)));
    }
    if let Some(height) = &reference.height {
        body.push_str(&format!("height: {}\n", dimension_scalar(height)));
    }
    if let Some(filter) = &reference.filter {
        body.push_str(&format!("filter: {}\n", yaml_scalar(filter)));
    }
    if let Some(view) = reference.view {
        let view = match view {
            MediaView::List => "list",
            MediaView::Grid => "grid",
        };
        body.push_str(&format!("view: {}\n", view));
    }
    body
}

fn dimension_scalar(dimension: &Dimension) -> String {
    match dimension {
        Dimension::Pixels(px) => px.to_string(),
        Dimension::Css(css) => yaml_scalar(css),
    }
}

/// Full fenced block, ready to replace a selection.
pub fn to_block(reference: &MediaReference) -> String {
    format!("```{}\n{}```", BLOCK_LANGUAGE, block_body(reference))
}
