//! Media references and resolved embed targets.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of player a reference is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Iframe,
    Youtube,
    /// Placeholder resolved from the extension or host before rendering.
    #[default]
    Auto,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Iframe => "iframe",
            MediaKind::Youtube => "youtube",
            MediaKind::Auto => "auto",
        }
    }

    /// Whether a player widget can attach to this kind.
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            MediaKind::Video | MediaKind::Audio | MediaKind::Youtube
        )
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "image" => Ok(MediaKind::Image),
            "iframe" => Ok(MediaKind::Iframe),
            "youtube" => Ok(MediaKind::Youtube),
            "auto" => Ok(MediaKind::Auto),
            other => Err(format!("Unknown media type: {}", other)),
        }
    }
}

/// Layout used when a reference expands to several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaView {
    #[default]
    List,
    Grid,
}

impl MediaView {
    pub fn css_class(&self) -> &'static str {
        match self {
            MediaView::List => "local-media-list",
            MediaView::Grid => "local-media-grid",
        }
    }
}

/// A player dimension: plain pixels or a pre-formatted CSS size.
///
/// Block bodies may say `width: 640` or `width: 100%`. Fractional numbers
/// such as `640.5` are kept as a CSS pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Dimension {
    Pixels(u32),
    Css(String),
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Pixels(u32),
            Number(f64),
            Css(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Pixels(px) => Ok(Dimension::Pixels(px)),
            Raw::Number(n) if n.is_finite() && n >= 0.0 => Ok(Dimension::Css(format!("{}px", n))),
            Raw::Number(n) => Err(D::Error::custom(format!(
                "invalid size {}: expected a non-negative number or a CSS value",
                n
            ))),
            Raw::Css(value) => Ok(Dimension::Css(value)),
        }
    }
}

impl Dimension {
    /// CSS value for an inline style.
    pub fn to_css(&self) -> String {
        match self {
            Dimension::Pixels(px) => format!("{}px", px),
            Dimension::Css(value) => value.trim().to_string(),
        }
    }
}

impl From<u32> for Dimension {
    fn from(px: u32) -> Self {
        Dimension::Pixels(px)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}", px),
            Dimension::Css(value) => f.write_str(value),
        }
    }
}

/// A media reference parsed from a fenced `media` block or a selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaReference {
    /// File path, `file:///` URI, HTTP(S) link or wildcard/directory pattern
    pub path: String,
    /// Explicit media kind; sniffed from the path when absent or `auto`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    /// Regular expression applied to file names when expanding a directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<MediaView>,
}

impl MediaReference {
    /// Create a reference with only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Explicit kind, treating `auto` as absent.
    pub fn explicit_kind(&self) -> Option<MediaKind> {
        self.kind.filter(|kind| *kind != MediaKind::Auto)
    }
}

/// A reference resolved to something a webview can load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// Original HTTP(S) link or constructed local delivery URL
    pub url: String,
    /// Never `auto`
    pub kind: MediaKind,
    /// Stable hash of the normalized path
    pub media_id: String,
}
