// SPDX-License-Identifier: GPL-3.0-or-later

//! Split free-form video titles into artist and track.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BRACKETED_CHUNKS: Regex = Regex::new(r"\s*(?:\([^)]*\)|\[[^\]]*\]|「[^」]*」|【[^】]*】)").unwrap();
    static ref OFFICIAL_MARKER: Regex =
        Regex::new(r"(?i)\s*-\s*(?:official\s+(?:music\s+)?(?:video|audio|mv)|lyrics?(?:\s+video)?)\b").unwrap();
    static ref ARTIST_SEPARATOR: Regex = Regex::new(r"^(?P<artist>.+?)\s*[-–—:：－]\s*(?P<track>.+)$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVideoTitle {
    pub artist: Option<String>,
    pub track: String,
}

/// Parse a video title. Returns `None` when nothing usable remains after cleanup.
pub fn parse_video_title(title: &str) -> Option<ParsedVideoTitle> {
    let cleaned = BRACKETED_CHUNKS.replace_all(title, "");
    let cleaned = OFFICIAL_MARKER.replace_all(cleaned.trim(), "");
    let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ").to_string();

    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = ARTIST_SEPARATOR.captures(&cleaned) {
        let artist = caps["artist"].trim();
        let track = caps["track"].trim();
        if !artist.is_empty() && !track.is_empty() {
            return Some(ParsedVideoTitle {
                artist: Some(artist.to_string()),
                track: track.to_string(),
            });
        }
    }

    Some(ParsedVideoTitle {
        artist: None,
        track: cleaned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(artist: Option<&str>, track: &str) -> Option<ParsedVideoTitle> {
        Some(ParsedVideoTitle {
            artist: artist.map(str::to_string),
            track: track.to_string(),
        })
    }

    #[test]
    fn splits_artist_and_track() {
        assert_eq!(
            parse_video_title("Rick Astley - Never Gonna Give You Up (Official Video)"),
            parsed(Some("Rick Astley"), "Never Gonna Give You Up")
        );
        assert_eq!(
            parse_video_title("Daft Punk: Harder, Better, Faster, Stronger [HD]"),
            parsed(Some("Daft Punk"), "Harder, Better, Faster, Stronger")
        );
    }

    #[test]
    fn strips_official_suffixes() {
        assert_eq!(
            parse_video_title("Metallica - Enter Sandman - Official Music Video"),
            parsed(Some("Metallica"), "Enter Sandman")
        );
        assert_eq!(
            parse_video_title("Adele - Hello - Lyrics"),
            parsed(Some("Adele"), "Hello")
        );
    }

    #[test]
    fn strips_official_markers_mid_title() {
        assert_eq!(
            parse_video_title("Gorillaz - Official Video - Feel Good Inc."),
            parsed(Some("Gorillaz"), "Feel Good Inc.")
        );
        assert_eq!(
            parse_video_title("Kendrick Lamar - HUMBLE. - Official Audio [Explicit] HD"),
            parsed(Some("Kendrick Lamar"), "HUMBLE. HD")
        );
    }

    #[test]
    fn handles_full_width_separators_and_brackets() {
        assert_eq!(
            parse_video_title("YOASOBI「夜に駆ける」 Official Music Video"),
            parsed(None, "YOASOBI Official Music Video")
        );
        assert_eq!(
            parse_video_title("米津玄師：Lemon【MV】"),
            parsed(Some("米津玄師"), "Lemon")
        );
    }

    #[test]
    fn title_without_artist_is_unqualified_track() {
        assert_eq!(parse_video_title("Bohemian Rhapsody"), parsed(None, "Bohemian Rhapsody"));
    }

    #[test]
    fn empty_after_cleanup_is_none() {
        assert_eq!(parse_video_title("(Official Video)"), None);
        assert_eq!(parse_video_title("   "), None);
    }
}
