//! Playback timestamps and the `timestamp-seek` anchor.
//!
//! Notes store anchors of the form
//! `<span class="timestamp-seek" data-media-id="<id>" data-seconds="<int>">1:02:03</span>`.
//! Clicking one seeks the player whose media id matches.

use crate::render::escape_html;
use regex::Regex;
use std::sync::LazyLock;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<span\s+class="timestamp-seek"\s+data-media-id="([^"]*)"\s+data-seconds="(\d+)"\s*>([^<]*)</span>"#,
    )
    .expect("Invalid ANCHOR_RE regex pattern")
});

/// Format whole seconds as `mm:ss`, or `h:mm:ss` from one hour on.
pub fn format_time(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;

    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Parse `ss`, `mm:ss` or `h:mm:ss` into seconds. `None` when malformed or
/// too large for `u64`.
pub fn parse_time(text: &str) -> Option<u64> {
    let parts = text
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*s),
        [m, s] => m.checked_mul(60)?.checked_add(*s),
        [s] => Some(*s),
        _ => None,
    }
}

/// A saved seek point for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampAnchor {
    pub media_id: String,
    pub seconds: u64,
}

impl TimestampAnchor {
    pub fn new(media_id: impl Into<String>, seconds: u64) -> Self {
        Self {
            media_id: media_id.into(),
            seconds,
        }
    }

    /// Build an anchor from a player's current position (fractions are rounded).
    pub fn at(media_id: impl Into<String>, current_time: f64) -> Self {
        let seconds = if current_time.is_finite() && current_time > 0.0 {
            current_time.round() as u64
        } else {
            0
        };
        Self::new(media_id, seconds)
    }

    pub fn label(&self) -> String {
        format_time(self.seconds)
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<span class="timestamp-seek" data-media-id="{}" data-seconds="{}">{}</span>"#,
            escape_html(&self.media_id),
            self.seconds,
            self.label()
        )
    }

    /// Every anchor in a note, in document order.
    pub fn parse_all(text: &str) -> Vec<Self> {
        ANCHOR_RE
            .captures_iter(text)
            .filter_map(|caps| {
                let seconds = caps.get(2)?.as_str().parse().ok()?;
                Some(Self::new(caps.get(1)?.as_str(), seconds))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_time_pads_minutes_and_seconds() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3600), "1:00:00");
        assert_eq!(format_time(3723), "1:02:03");
        assert_eq!(format_time(359_999), "99:59:59");
    }

    #[test]
    fn parse_time_accepts_all_forms() {
        assert_eq!(parse_time("42"), Some(42));
        assert_eq!(parse_time("01:05"), Some(65));
        assert_eq!(parse_time("1:02:03"), Some(3723));
        assert_eq!(parse_time("1:2:3:4"), None);
        assert_eq!(parse_time("ab:01"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn parse_time_rejects_overflow() {
        assert_eq!(parse_time("99999999999999999:00:00"), None);
        assert_eq!(parse_time("307445734561825861:00"), None);
        assert_eq!(parse_time("0:18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_time("0:1:18446744073709551615"), None);
    }

    #[test]
    fn format_parse_round_trip() {
        for s in (0..=359_999u64).step_by(7).chain([59, 60, 3599, 3600, 359_999]) {
            assert_eq!(parse_time(&format_time(s)), Some(s), "seconds = {}", s);
        }
    }

    #[test]
    fn anchor_markup_is_exact() {
        let anchor = TimestampAnchor::new("1x2y3z", 125);
        assert_eq!(
            anchor.to_html(),
            r#"<span class="timestamp-seek" data-media-id="1x2y3z" data-seconds="125">02:05</span>"#
        );
    }

    #[test]
    fn anchor_escapes_media_id() {
        let anchor = TimestampAnchor::new(r#"x" onclick="alert(1)"#, 1);
        assert_eq!(
            anchor.to_html(),
            r#"<span class="timestamp-seek" data-media-id="x&quot; onclick=&quot;alert(1)" data-seconds="1">00:01</span>"#
        );
    }

    #[test]
    fn anchor_rounds_current_time() {
        assert_eq!(TimestampAnchor::at("a", 12.6).seconds, 13);
        assert_eq!(TimestampAnchor::at("a", f64::NAN).seconds, 0);
        assert_eq!(TimestampAnchor::at("a", -3.0).seconds, 0);
    }

    #[test]
    fn anchors_are_parsed_from_saved_notes() {
        let note = format!(
            "Intro {} and later {} done",
            TimestampAnchor::new("abc", 5).to_html(),
            r#"<span class="timestamp-seek" data-media-id="" data-seconds="3600">1:00:00</span>"#
        );

        let anchors = TimestampAnchor::parse_all(&note);

        assert_eq!(
            anchors,
            vec![TimestampAnchor::new("abc", 5), TimestampAnchor::new("", 3600)]
        );
    }
}
