//! Player markup for media references.
//!
//! Rendering never fails: anything that cannot be resolved turns into a
//! notice plus an inert error paragraph, so one bad reference does not break
//! the rest of the note.

use crate::block::parse_block;
use crate::config::Settings;
use crate::expander::expand;
use crate::notice::Notifier;
use crate::resolver::{resolve_reference, ResolveError};
use local_media_types::{Dimension, MediaKind, MediaReference, ResolvedTarget};
use tracing::{debug, warn};

/// Class of the wrapper around each player.
pub const CONTAINER_CLASS: &str = "local-media-container";

/// Class of the paragraph shown instead of a player.
pub const ERROR_CLASS: &str = "local-media-error";

/// Escape text for use inside an HTML attribute or element.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inert fragment shown in place of a player.
pub fn error_fragment(message: &str) -> String {
    format!(r#"<p class="{}">{}</p>"#, ERROR_CLASS, escape_html(message))
}

fn player_html(target: &ResolvedTarget) -> String {
    let id = escape_html(&target.media_id);
    let url = escape_html(&target.url);

    match target.kind {
        MediaKind::Video => format!(
            "<video data-media-id=\"{id}\" class=\"plyr-player\" playsinline controls>\n    <source src=\"{url}\" type=\"video/mp4\">\n</video>"
        ),
        MediaKind::Audio => format!(
            "<audio data-media-id=\"{id}\" class=\"plyr-player\" controls>\n    <source src=\"{url}\" type=\"audio/mpeg\">\n</audio>"
        ),
        MediaKind::Youtube => format!(
            r#"<div data-media-id="{id}" class="plyr-player plyr__video-embed" data-plyr-provider="youtube" data-plyr-embed-id="{url}"></div>"#
        ),
        MediaKind::Image => format!(
            r#"<img data-media-id="{id}" class="local-media-image" src="{url}" alt="" style="width: 100%; height: 100%; object-fit: contain;">"#
        ),
        MediaKind::Iframe | MediaKind::Auto => format!(
            r#"<iframe data-media-id="{id}" class="plyr-player" src="{url}" frameborder="0" allowfullscreen></iframe>"#
        ),
    }
}

/// Wrapper style for one player. Audio players size themselves vertically.
fn container_style(kind: MediaKind, width: &Dimension, height: &Dimension) -> String {
    let mut style = format!("width: {}; max-width: 100%;", width.to_css());
    if kind != MediaKind::Audio {
        style.push_str(&format!(" height: {};", height.to_css()));
    }
    style.push_str(" margin: 0 auto; overflow: hidden;");
    style
}

/// One wrapped player for a resolved target.
pub fn media_fragment(target: &ResolvedTarget, width: &Dimension, height: &Dimension) -> String {
    format!(
        "<div class=\"{}\" style=\"{}\">\n{}\n</div>",
        CONTAINER_CLASS,
        escape_html(&container_style(target.kind, width, height)),
        player_html(target)
    )
}

/// Render a reference into player markup.
///
/// Directory and wildcard references become a list (or grid) with one
/// player per matching file.
pub fn render(reference: &MediaReference, settings: &Settings, notifier: &dyn Notifier) -> String {
    let width = reference
        .width
        .clone()
        .unwrap_or(Dimension::Pixels(settings.default_width));
    let height = reference
        .height
        .clone()
        .unwrap_or(Dimension::Pixels(settings.default_height));
    let options = settings.resolve_options();

    let paths = expand(reference, settings.max_embeds, notifier);
    let resolved: Vec<Result<ResolvedTarget, ResolveError>> = paths
        .iter()
        .map(|path| {
            let single = MediaReference {
                path: path.clone(),
                ..reference.clone()
            };
            resolve_reference(&single, &options)
        })
        .collect();

    if let [only] = resolved.as_slice() {
        return match only {
            Ok(target) => media_fragment(target, &width, &height),
            Err(e) => {
                let message = e.to_string();
                notifier.notice(&message);
                error_fragment(&message)
            }
        };
    }

    let mut fragments = Vec::new();
    let mut first_error = None;
    for (path, result) in paths.iter().zip(resolved) {
        match result {
            Ok(target) => fragments.push(media_fragment(&target, &width, &height)),
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if fragments.is_empty() {
        let message = first_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| ResolveError::Empty.to_string());
        notifier.notice(&message);
        return error_fragment(&message);
    }

    debug!("Rendered {} players for {}", fragments.len(), reference.path);
    format!(
        "<div class=\"{}\">\n{}\n</div>",
        reference.view.unwrap_or_default().css_class(),
        fragments.join("\n")
    )
}

/// Render a fenced `media` block body.
pub fn render_block(source: &str, settings: &Settings, notifier: &dyn Notifier) -> String {
    match parse_block(source) {
        Ok(reference) => render(&reference, settings, notifier),
        Err(e) => {
            warn!("Failed to parse media block: {}", e);
            error_fragment(&format!("Error parsing media block: {}", e))
        }
    }
}
