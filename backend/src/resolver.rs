//! Path and link resolution.
//!
//! Turns whatever the user selected (a quoted Windows path, a `file:///`
//! URI, a percent-encoded POSIX path or an HTTP(S) link) into a
//! [`ResolvedTarget`] the webview can load.

use local_media_types::{MediaKind, MediaReference, ResolvedTarget, DEFAULT_BASELINK, DEFAULT_PORT};
use thiserror::Error;
use tracing::debug;

/// Video extensions, lowercase.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogg", "ogv", "mov", "m4v", "mkv", "avi", "wmv", "flv",
];

/// Audio extensions, lowercase.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "oga", "weba", "m4a", "flac", "aac", "opus"];

/// Image extensions, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

const FILE_SCHEME: &str = "file:///";

/// Errors produced while resolving a raw path. The message is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("File path not provided")]
    Empty,

    #[error("File path is not valid UTF-8 after decoding: {0}")]
    Encoding(String),

    #[error("The provided file path or link is not valid: {0}")]
    InvalidPath(String),

    #[error("Path traversal is not allowed: {0}")]
    Traversal(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

/// How local files are delivered to the webview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Through the loopback media server: `<baselink>:<port>/?q=<path>`
    LocalServer { baselink: String, port: u16 },
    /// Through the host's internal resource scheme: `<origin>/<path>`
    AppResource { origin: String },
}

impl Default for Delivery {
    fn default() -> Self {
        Delivery::LocalServer {
            baselink: DEFAULT_BASELINK.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Options shared by every resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub delivery: Delivery,
    /// Reject `..` and `~` segments in local paths
    pub traversal_guard: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            delivery: Delivery::default(),
            traversal_guard: true,
        }
    }
}

/// Trim, strip one layer of matching quotes and drop pasted line breaks.
pub fn clean_path(raw: &str) -> String {
    let mut cleaned = raw.trim();
    let quoted = cleaned.len() >= 2
        && ((cleaned.starts_with('"') && cleaned.ends_with('"'))
            || (cleaned.starts_with('\'') && cleaned.ends_with('\'')));
    if quoted {
        cleaned = cleaned[1..cleaned.len() - 1].trim();
    }
    cleaned.replace(['\r', '\n'], "").trim().to_string()
}

/// Strip a leading `file:///` scheme.
///
/// `file:///C:/x` yields `C:/x`, `file:///home/x` yields `/home/x`.
pub fn strip_file_scheme(path: &str) -> &str {
    match path.strip_prefix(FILE_SCHEME) {
        Some(rest) if is_windows_path(rest) => rest,
        Some(_) => &path[FILE_SCHEME.len() - 1..],
        None => path,
    }
}

pub fn is_link(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

pub fn is_windows_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

pub fn is_unix_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Whether the string is an absolute local path or an HTTP(S) link.
pub fn is_valid_path(path: &str) -> bool {
    is_windows_path(path) || is_unix_path(path) || is_link(path)
}

/// Whether any segment walks upwards or into a home directory shorthand.
pub fn has_traversal(path: &str) -> bool {
    path.split(['/', '\\'])
        .any(|segment| segment == ".." || segment.starts_with('~'))
}

/// Lowercase extension of the last path segment. Query and fragment are
/// ignored for links only; `#` and `?` are ordinary characters in file names.
pub fn extension_of(path: &str) -> Option<String> {
    let name = if is_link(path) {
        path.split(['?', '#']).next().unwrap_or(path)
    } else {
        path
    };
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the extension is in the local file allow-list.
pub fn is_allowed_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();
    VIDEO_EXTENSIONS.contains(&ext) || AUDIO_EXTENSIONS.contains(&ext) || IMAGE_EXTENSIONS.contains(&ext)
}

fn link_host(link: &str) -> &str {
    let rest = link.split_once("://").map(|(_, rest)| rest).unwrap_or(link);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

fn is_youtube(path: &str) -> bool {
    let haystack = if is_link(path) { link_host(path) } else { path };
    let haystack = haystack.to_ascii_lowercase();
    haystack.contains("youtube.com") || haystack.contains("youtu.be")
}

/// Sniff the media kind from the host or extension. Never returns `auto`.
pub fn determine_kind(path: &str) -> MediaKind {
    let path = strip_file_scheme(path);
    if is_youtube(path) {
        return MediaKind::Youtube;
    }

    match extension_of(path) {
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
        Some(ext) if AUDIO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Audio,
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Image,
        _ => MediaKind::Iframe,
    }
}

/// Whether a file name looks like something a player can attach to.
pub fn is_playable(path: &str) -> bool {
    determine_kind(path).is_playable()
}

/// Stable identifier used to correlate a rendered player with timestamp anchors.
///
/// 32-bit rolling hash (`hash * 31 + unit`) over UTF-16 code units, absolute
/// value in base 36. Identifiers already saved in notes depend on this exact
/// scheme.
pub fn media_id(path: &str) -> String {
    let hash = path
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)));
    to_base36(u64::from(hash.unsigned_abs()))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Percent-encode every segment, keeping `/` separators. Backslashes become `/`.
pub fn encode_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply cleaning, scheme stripping and percent-decoding.
///
/// Links are returned cleaned but otherwise untouched.
pub fn normalize(raw: &str) -> Result<String, ResolveError> {
    let cleaned = clean_path(raw);
    let stripped = strip_file_scheme(&cleaned);
    if is_link(stripped) {
        return Ok(stripped.to_string());
    }
    urlencoding::decode(stripped)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ResolveError::Encoding(stripped.to_string()))
}

/// Build the URL a webview loads a validated local path from.
pub fn delivery_url(path: &str, delivery: &Delivery) -> String {
    let encoded = encode_path(path);
    match delivery {
        Delivery::LocalServer { baselink, port } => {
            format!("{}:{}/?q={}", baselink.trim_end_matches('/'), port, encoded)
        }
        Delivery::AppResource { origin } => {
            format!("{}/{}", origin.trim_end_matches('/'), encoded)
        }
    }
}

/// Resolve a raw path or link, sniffing the media kind.
pub fn resolve(raw: &str, options: &ResolveOptions) -> Result<ResolvedTarget, ResolveError> {
    resolve_with_kind(raw, None, options)
}

/// Resolve a parsed reference, honouring an explicit kind.
pub fn resolve_reference(
    reference: &MediaReference,
    options: &ResolveOptions,
) -> Result<ResolvedTarget, ResolveError> {
    resolve_with_kind(&reference.path, reference.explicit_kind(), options)
}

fn resolve_with_kind(
    raw: &str,
    kind: Option<MediaKind>,
    options: &ResolveOptions,
) -> Result<ResolvedTarget, ResolveError> {
    let path = normalize(raw)?;
    if path.is_empty() {
        return Err(ResolveError::Empty);
    }

    let url = if is_link(&path) {
        path.clone()
    } else {
        if options.traversal_guard && has_traversal(&path) {
            return Err(ResolveError::Traversal(path));
        }
        if !is_windows_path(&path) && !is_unix_path(&path) {
            return Err(ResolveError::InvalidPath(path));
        }
        match extension_of(&path) {
            Some(ext) if is_allowed_extension(&ext) => {}
            Some(ext) => return Err(ResolveError::UnsupportedExtension(ext)),
            None => return Err(ResolveError::UnsupportedExtension(path)),
        }
        delivery_url(&path, &options.delivery)
    };

    let kind = kind.unwrap_or_else(|| determine_kind(&path));
    let media_id = media_id(&path);
    debug!("Resolved {} as {} ({})", path, kind, media_id);

    Ok(ResolvedTarget {
        url,
        kind,
        media_id,
    })
}
