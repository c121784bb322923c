//! Editor commands.
//!
//! Each command takes the current selection (or the player tree of the
//! active note) and returns the text that should replace the selection.
//! `None` means nothing should be inserted; the user has been notified.

use crate::block::to_block;
use crate::config::Settings;
use crate::notice::Notifier;
use crate::registry::{find_active_player, player_media_id, PlayerTree};
use crate::resolver::{clean_path, determine_kind, resolve, strip_file_scheme};
use crate::timestamp::TimestampAnchor;
use local_media_types::{Dimension, MediaKind, MediaReference, MediaView};
use tracing::debug;

/// Commands offered to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    EmbedIframe,
    EmbedVideo,
    EmbedAudio,
    EmbedAuto,
    EmbedCodeBlock,
    InsertTimestamp,
    ToggleServer,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::EmbedIframe,
        Command::EmbedVideo,
        Command::EmbedAudio,
        Command::EmbedAuto,
        Command::EmbedCodeBlock,
        Command::InsertTimestamp,
        Command::ToggleServer,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Command::EmbedIframe => "embed-iframe",
            Command::EmbedVideo => "embed-video",
            Command::EmbedAudio => "embed-audio",
            Command::EmbedAuto => "embed-auto",
            Command::EmbedCodeBlock => "embed-code-block",
            Command::InsertTimestamp => "insert-timestamp",
            Command::ToggleServer => "toggle-server",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Command::EmbedIframe => "Embed link in iframe",
            Command::EmbedVideo => "Embed link in video tag",
            Command::EmbedAudio => "Embed link in audio tag",
            Command::EmbedAuto => "Embed auto",
            Command::EmbedCodeBlock => "Embed selected media path",
            Command::InsertTimestamp => "Insert video timestamp",
            Command::ToggleServer => "Toggle local media server",
        }
    }

    /// Kind produced by the inline embed commands.
    pub fn inline_kind(&self) -> Option<MediaKind> {
        match self {
            Command::EmbedIframe => Some(MediaKind::Iframe),
            Command::EmbedVideo => Some(MediaKind::Video),
            Command::EmbedAudio => Some(MediaKind::Audio),
            Command::EmbedAuto => Some(MediaKind::Auto),
            _ => None,
        }
    }
}

/// Commands shown in the editor context menu.
pub fn context_menu(settings: &Settings) -> Vec<Command> {
    if !settings.show_in_menu_item {
        return Vec::new();
    }
    vec![
        Command::EmbedVideo,
        Command::EmbedAudio,
        Command::EmbedAuto,
        Command::EmbedCodeBlock,
        Command::InsertTimestamp,
    ]
}

/// Plain HTML (or markdown for images) embedding the selection.
///
/// `kind` of `auto` is sniffed from the selection; a YouTube link embeds as
/// an iframe.
pub fn embed_inline(
    selection: &str,
    kind: MediaKind,
    settings: &Settings,
    notifier: &dyn Notifier,
) -> Option<String> {
    let target = match resolve(selection, &settings.resolve_options()) {
        Ok(target) => target,
        Err(e) => {
            notifier.notice(&e.to_string());
            return None;
        }
    };

    let kind = match kind {
        MediaKind::Auto => target.kind,
        kind => kind,
    };
    let (width, height) = (settings.default_width, settings.default_height);
    let url = &target.url;
    debug!("Embedding {} inline as {}", url, kind);

    let html = match kind {
        MediaKind::Video => format!(
            "<video width=\"{width}\" height=\"{height}\" controls>\n    <source src=\"{url}\" type=\"video/mp4\">\n    Your browser does not support the video tag.\n</video>"
        ),
        MediaKind::Audio => format!(
            "<audio controls>\n\t<source src=\"{url}\" type=\"audio/mpeg\">\n\tYour browser does not support the audio tag.\n</audio>"
        ),
        MediaKind::Image => format!("![]({url})"),
        _ => format!(
            r#"<iframe src="{url}" width="{width}" height="{height}" frameborder="0" allowfullscreen></iframe>"#
        ),
    };
    Some(html)
}

/// A fenced `media` block for the selection.
pub fn embed_code_block(
    selection: &str,
    settings: &Settings,
    notifier: &dyn Notifier,
) -> Option<String> {
    let cleaned = clean_path(selection);
    let path = strip_file_scheme(&cleaned);
    if path.is_empty() {
        notifier.notice("File path not provided");
        return None;
    }

    let kind = determine_kind(path);
    let mut reference = MediaReference::new(path).with_kind(kind);
    if matches!(kind, MediaKind::Video | MediaKind::Iframe | MediaKind::Youtube) {
        reference.width = Some(Dimension::Pixels(settings.default_width));
        reference.height = Some(Dimension::Pixels(settings.default_height));
    }
    if path.contains('*') || path.ends_with(['/', '\\']) {
        reference.view = Some(MediaView::List);
    }

    Some(to_block(&reference))
}

/// A `timestamp-seek` anchor for the active player, followed by a space.
pub fn insert_timestamp(tree: &dyn PlayerTree, notifier: &dyn Notifier) -> Option<String> {
    let Some(player) = find_active_player(tree, notifier) else {
        notifier.notice("No active video player found in this note.");
        return None;
    };

    let media_id = player_media_id(player.as_ref()).unwrap_or_default();
    let anchor = TimestampAnchor::at(media_id, player.current_time());
    Some(format!("{} ", anchor.to_html()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::parse_block;
    use crate::notice::RecordingNotifier;
    use crate::registry::testing::{FakePlayer, FakeTree};
    use crate::registry::Player;
    use crate::resolver::media_id;
    use std::rc::Rc;

    fn embed(selection: &str, kind: MediaKind) -> (Option<String>, Vec<String>) {
        let notifier = RecordingNotifier::new();
        let html = embed_inline(selection, kind, &Settings::default(), &notifier);
        (html, notifier.notices())
    }

    #[test]
    fn inline_video_uses_local_server() {
        let (html, notices) = embed("C:\\Videos\\a b.mp4", MediaKind::Video);

        assert!(notices.is_empty());
        assert_eq!(
            html.unwrap(),
            "<video width=\"640\" height=\"360\" controls>\n    <source src=\"http://127.0.0.1:5555/?q=C%3A/Videos/a%20b.mp4\" type=\"video/mp4\">\n    Your browser does not support the video tag.\n</video>"
        );
    }

    #[test]
    fn inline_auto_sniffs_kind() {
        let (audio, _) = embed("/music/a.mp3", MediaKind::Auto);
        assert!(audio.unwrap().starts_with("<audio controls>"));

        let (image, _) = embed("/pics/a.jpeg", MediaKind::Auto);
        assert_eq!(image.unwrap(), "![](http://127.0.0.1:5555/?q=/pics/a.jpeg)");

        let (page, _) = embed("https://example.com/page", MediaKind::Auto);
        assert_eq!(
            page.unwrap(),
            r#"<iframe src="https://example.com/page" width="640" height="360" frameborder="0" allowfullscreen></iframe>"#
        );
    }

    #[test]
    fn inline_youtube_embeds_as_iframe() {
        let (html, _) = embed("https://www.youtube.com/watch?v=abc", MediaKind::Auto);
        assert!(html.unwrap().starts_with(r#"<iframe src="https://www.youtube.com/watch?v=abc""#));
    }

    #[test]
    fn inline_rejects_empty_and_invalid_selection() {
        let (html, notices) = embed("", MediaKind::Video);
        assert!(html.is_none());
        assert_eq!(notices, vec!["File path not provided"]);

        let (html, notices) = embed("videos/a.mp4", MediaKind::Video);
        assert!(html.is_none());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn code_block_for_video() {
        let notifier = RecordingNotifier::new();
        let block = embed_code_block("\"file:///C:/Videos/a.mp4\"", &Settings::default(), &notifier).unwrap();

        assert_eq!(
            block,
            "```media\npath: C:/Videos/a.mp4\ntype: video\nwidth: 640\nheight: 360\n```"
        );
    }

    #[test]
    fn code_block_for_audio_has_no_size() {
        let block = embed_code_block("/music/a.mp3", &Settings::default(), &RecordingNotifier::new()).unwrap();
        assert_eq!(block, "```media\npath: /music/a.mp3\ntype: audio\n```");
    }

    #[test]
    fn code_block_for_directory_is_a_list() {
        let block = embed_code_block("/home/me/lectures/", &Settings::default(), &RecordingNotifier::new()).unwrap();

        assert!(block.ends_with("view: list\n```"));
        let body = block.trim_start_matches("```media\n").trim_end_matches("```");
        let reference = parse_block(body).unwrap();
        assert_eq!(reference.path, "/home/me/lectures/");
        assert_eq!(reference.view, Some(MediaView::List));
    }

    #[test]
    fn code_block_needs_a_selection() {
        let notifier = RecordingNotifier::new();
        assert!(embed_code_block("  ", &Settings::default(), &notifier).is_none());
        assert_eq!(notifier.notices(), vec!["File path not provided"]);
    }

    #[test]
    fn timestamp_for_active_player() {
        let playing: Player = Rc::new(FakePlayer::html5("abc").started().at(125.4));
        let tree = FakeTree::with(vec![Rc::new(FakePlayer::html5("other")) as Player, playing]);

        let text = insert_timestamp(&tree, &RecordingNotifier::new()).unwrap();

        assert_eq!(
            text,
            r#"<span class="timestamp-seek" data-media-id="abc" data-seconds="125">02:05</span> "#
        );
    }

    #[test]
    fn timestamp_for_youtube_hashes_source() {
        let source = "https://youtu.be/xyz";
        let tree = FakeTree::with(vec![Rc::new(FakePlayer::youtube(source).at(3600.0)) as Player]);

        let text = insert_timestamp(&tree, &RecordingNotifier::new()).unwrap();

        assert!(text.contains(&format!(r#"data-media-id="{}""#, media_id(source))));
        assert!(text.contains(">1:00:00</span>"));
    }

    #[test]
    fn timestamp_without_player_notifies() {
        let notifier = RecordingNotifier::new();

        assert!(insert_timestamp(&FakeTree::default(), &notifier).is_none());
        assert_eq!(notifier.notices(), vec!["No active video player found in this note."]);
    }

    #[test]
    fn context_menu_follows_setting() {
        let mut settings = Settings::default();
        assert!(context_menu(&settings).contains(&Command::EmbedCodeBlock));

        settings.show_in_menu_item = false;
        assert!(context_menu(&settings).is_empty());
    }

    #[test]
    fn command_ids_are_unique() {
        let mut ids: Vec<_> = Command::ALL.iter().map(Command::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Command::ALL.len());
        assert_eq!(Command::EmbedAuto.inline_kind(), Some(MediaKind::Auto));
        assert_eq!(Command::ToggleServer.inline_kind(), None);
    }
}
