//! Player lookup.
//!
//! Player widgets are owned by the host page. This module only queries them
//! through [`PlayerTree`] and [`PlayerHandle`] to find the player a
//! timestamp belongs to. Nothing here holds on to a player past one call.

use crate::notice::Notifier;
use crate::resolver::media_id;
use crate::timestamp::TimestampAnchor;
use std::rc::Rc;
use tracing::debug;

/// Elements the player widget is created from.
pub const PLAYER_SELECTOR: &str = ".plyr-player, .plyr";

/// Containers the widget wraps around the original element.
pub const CONTAINER_SELECTOR: &str = ".plyr--full-ui";

/// Attribute carrying the media id on rendered markup.
pub const MEDIA_ID_ATTRIBUTE: &str = "data-media-id";

const YOUTUBE_PROVIDER: &str = "youtube";

/// A DOM element, reduced to attribute access.
pub trait Element {
    fn attribute(&self, name: &str) -> Option<String>;
}

/// The read/seek surface of a player widget instance.
pub trait PlayerHandle {
    /// Current position in seconds
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    fn playing(&self) -> bool;
    /// `html5`, `youtube`, ...
    fn provider(&self) -> String;
    fn source(&self) -> Option<String>;
    fn play(&self);
    /// Element the player was created from
    fn original(&self) -> Option<&dyn Element>;
    /// Wrapper element the widget rendered
    fn container(&self) -> Option<&dyn Element>;
    /// Underlying media element
    fn media(&self) -> Option<&dyn Element>;
}

pub type Player = Rc<dyn PlayerHandle>;

/// A subtree of the page that player widgets are attached to.
pub trait PlayerTree {
    /// Players attached to elements matching `selector`, in document order.
    fn players_at(&self, selector: &str) -> Vec<Player>;
}

fn same_player(a: &Player, b: &Player) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Every distinct player under the tree: original elements first, then containers.
pub fn find_all_players(tree: &dyn PlayerTree) -> Vec<Player> {
    let mut players: Vec<Player> = Vec::new();
    for player in tree
        .players_at(PLAYER_SELECTOR)
        .into_iter()
        .chain(tree.players_at(CONTAINER_SELECTOR))
    {
        if !players.iter().any(|known| same_player(known, &player)) {
            players.push(player);
        }
    }
    players
}

/// The player a new timestamp should refer to.
///
/// Prefers one that is playing, then a sole player, then the first of
/// several (telling the user about the ambiguity).
pub fn find_active_player(tree: &dyn PlayerTree, notifier: &dyn Notifier) -> Option<Player> {
    let players = find_all_players(tree);

    if let Some(playing) = players.iter().find(|p| p.playing()) {
        return Some(playing.clone());
    }

    match players.len() {
        0 => None,
        1 => players.into_iter().next(),
        n => {
            debug!("{} players found, none playing", n);
            notifier.notice("Multiple players found. Using the first one.");
            players.into_iter().next()
        }
    }
}

/// The media id a player carries, falling back to a hash of a YouTube source.
pub fn player_media_id(player: &dyn PlayerHandle) -> Option<String> {
    let attached = [player.original(), player.container(), player.media()]
        .into_iter()
        .flatten()
        .find_map(|el| el.attribute(MEDIA_ID_ATTRIBUTE).filter(|id| !id.is_empty()));
    if attached.is_some() {
        return attached;
    }

    if player.provider() == YOUTUBE_PROVIDER {
        return player.source().map(|source| media_id(&source));
    }
    None
}

/// The first player whose elements carry `id`.
pub fn find_player_by_id(tree: &dyn PlayerTree, id: &str) -> Option<Player> {
    if id.is_empty() {
        return None;
    }

    find_all_players(tree).into_iter().find(|player| {
        let attached = [player.original(), player.container(), player.media()]
            .into_iter()
            .flatten()
            .any(|el| el.attribute(MEDIA_ID_ATTRIBUTE).as_deref() == Some(id));
        if attached {
            return true;
        }

        player.provider() == YOUTUBE_PROVIDER
            && player.source().is_some_and(|source| media_id(&source) == id)
    })
}

/// Seek the player an anchor points at and start playback.
///
/// Returns `false` (after notifying) when no player matches.
pub fn seek_to(tree: &dyn PlayerTree, anchor: &TimestampAnchor, notifier: &dyn Notifier) -> bool {
    match find_player_by_id(tree, &anchor.media_id) {
        Some(player) => {
            player.set_current_time(anchor.seconds as f64);
            player.play();
            true
        }
        None => {
            notifier.notice("No player found for this timestamp.");
            false
        }
    }
}
