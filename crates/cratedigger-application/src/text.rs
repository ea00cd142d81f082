// SPDX-License-Identifier: GPL-3.0-or-later

//! Text normalization and fuzzy similarity for artist and album names.
//!
//! Catalog titles and folder names disagree in predictable ways: casing,
//! accents, bracketed edition notes, trailing years, leading articles and
//! punctuation. [`normalize`] folds those away so that names can be keyed
//! and compared; [`similar`] then tolerates small residual differences with
//! a Levenshtein ratio guarded against substring and length mismatches.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Default acceptance threshold for album titles.
pub const ALBUM_THRESHOLD: f64 = 0.85;
/// Default acceptance threshold for artist names; stricter than albums.
pub const ARTIST_THRESHOLD: f64 = 0.90;
/// A containment match only counts when the shorter string covers this share of the longer.
const CONTAINMENT_RATIO: f64 = 0.70;
/// Strings whose lengths differ by more than this share of the longer one never match.
const MAX_LENGTH_DIFFERENCE: f64 = 0.30;

const EDITION_KEYWORDS: &[&str] = &[
    "remaster", "remastered", "edition", "deluxe", "bonus", "expanded", "anniversary",
    "reissue", "special", "limited", "collectors", "collector", "extended", "version",
    "vol", "volume", "disc", "cd", "lp", "ep", "digital", "vinyl", "explicit", "clean",
    "instrumental", "live", "acoustic", "unplugged", "demo", "bootleg", "rerecorded",
    "redux", "revisited", "enhanced", "super", "ultimate", "definitive", "complete",
    "compiled", "best", "greatest", "hits", "full", "dynamic", "range", "hd", "hq",
    "hi res", "highres", "flac", "wav", "mp3",
];

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"\s*[(\[{][^)\]}]*[)\]}]\s*").unwrap();
    static ref PLUS_SUFFIX: Regex = Regex::new(r"\s*\+.*$").unwrap();
    static ref TRAILING_DOTS: Regex = Regex::new(r"\.+$").unwrap();
    static ref LEADING_ARTICLE: Regex = Regex::new(r"^(?:the|a|an)\s+").unwrap();
    static ref POSSESSIVE: Regex = Regex::new(r"['’]s?\b").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref EDITION_SUFFIX: Regex =
        Regex::new(&format!(r"\s+(?:{})\b.*$", EDITION_KEYWORDS.join("|"))).unwrap();
    static ref TRAILING_YEAR: Regex = Regex::new(r"\s+\d{4}\s*$").unwrap();
}

/// Thresholds used when comparing names against the collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub album: f64,
    pub artist: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            album: ALBUM_THRESHOLD,
            artist: ARTIST_THRESHOLD,
        }
    }
}

/// Canonical comparison form of a name.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`. Each rewrite pass
/// only removes characters, so iterating to a fixed point terminates.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let folded: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();

    let text = BRACKETED.replace_all(&folded, " ");
    let text = PLUS_SUFFIX.replace(&text, "");
    let text = TRAILING_DOTS.replace(text.trim(), "");
    let text = LEADING_ARTICLE.replace(text.trim(), "");
    let text = POSSESSIVE.replace_all(&text, "");
    let text = PUNCTUATION.replace_all(&text, "");
    let text = WHITESPACE.replace_all(text.trim(), " ");
    let text = EDITION_SUFFIX.replace(&text, "");
    let text = TRAILING_YEAR.replace(&text, "");

    text.trim().to_string()
}

/// Whether two raw names refer to the same thing at the given threshold.
/// Both sides are normalized first.
pub fn similar(a: &str, b: &str, threshold: f64) -> bool {
    similar_normalized(&normalize(a), &normalize(b), threshold)
}

/// Like [`similar`], for strings that are already normalized.
///
/// Symmetric in its arguments. Empty input never matches.
pub fn similar_normalized(a: &str, b: &str, threshold: f64) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let (shorter, longer) = (len_a.min(len_b) as f64, len_a.max(len_b) as f64);

    if (a.contains(b) || b.contains(a)) && shorter / longer >= CONTAINMENT_RATIO {
        return true;
    }

    if longer - shorter > longer * MAX_LENGTH_DIFFERENCE {
        return false;
    }

    similarity_ratio(a, b) >= threshold
}

/// `1 - distance / max_len`, in `[0, 1]`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Edit distance in chars, keeping a single row sized to the shorter input.
fn edit_distance(a: &str, b: &str) -> usize {
    let (a, b): (Vec<char>, Vec<char>) = (a.chars().collect(), b.chars().collect());
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    // row[j] holds the distance between the consumed prefix of `outer` and inner[..j].
    let mut row: Vec<usize> = (0..=inner.len()).collect();
    for (i, &oc) in outer.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &ic) in inner.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if oc == ic {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[inner.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_counts_chars_not_bytes() {
        assert_eq!(edit_distance("bjork", "björk"), 1);
        assert_eq!(edit_distance("sigur ros", "sigur rós"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "xabc"), edit_distance("xabc", "abc"));
    }

    #[test]
    fn normalize_strips_edition_noise() {
        assert_eq!(normalize("Master Of Puppets (Remastered 2017)"), "master of puppets");
        assert_eq!(normalize("Abbey Road [Super Deluxe Edition]"), "abbey road");
        assert_eq!(normalize("Discovery - Deluxe Edition"), "discovery");
        assert_eq!(normalize("Rumours 2004"), "rumours");
        assert_eq!(normalize("Ride The Lightning + Demos"), "ride the lightning");
    }

    #[test]
    fn normalize_folds_case_accents_and_punctuation() {
        assert_eq!(normalize("Beyoncé"), "beyonce");
        assert_eq!(normalize("Motörhead"), "motorhead");
        assert_eq!(normalize("The Beatles"), "beatles");
        assert_eq!(normalize("Guns N' Roses"), "guns n roses");
        assert_eq!(normalize("Sgt. Pepper's Lonely Hearts Club Band"), "sgt pepper lonely hearts club band");
        assert_eq!(normalize("AC/DC"), "acdc");
        assert_eq!(normalize("  Back   in  Black...  "), "back in black");
    }

    #[test]
    fn normalize_keeps_names_that_only_look_like_noise() {
        assert_eq!(normalize("1984"), "1984");
        assert_eq!(normalize("Live After Death"), "live after death");
        assert_eq!(normalize("A"), "a");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Master Of Puppets (Remastered 2017)",
            "The The",
            "(Deluxe) The Wall",
            "'The Band'",
            "An  A  Album 1999 1998",
            "Ænima",
            "Sigur Rós - ( )",
            "",
            "   ",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn normalize_blank_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("(Bonus Tracks)"), "");
    }

    #[test]
    fn similar_accepts_remaster_variants() {
        assert!(similar("Master of Puppets", "Master Of Puppets (Remastered 2017)", ALBUM_THRESHOLD));
    }

    #[test]
    fn similar_rejects_different_albums() {
        assert!(!similar("Abbey Road", "Let It Be", ALBUM_THRESHOLD));
    }

    #[test]
    fn similar_tolerates_small_typos() {
        assert!(similar("Metallica", "Metalica", ALBUM_THRESHOLD));
        assert!(!similar("Metallica", "Megadeth", ARTIST_THRESHOLD));
    }

    #[test]
    fn containment_requires_coverage() {
        // "nevermind" is 9 of 18 characters of the other title.
        assert!(!similar_normalized("nevermind", "nevermind the bolx", ALBUM_THRESHOLD));
        // 21 of 25 characters.
        assert!(similar_normalized("dark side of the moon", "the dark side of the moon", ALBUM_THRESHOLD));
    }

    #[test]
    fn large_length_difference_short_circuits() {
        assert!(!similar_normalized("abc", "abcdefgh", 0.0));
    }

    #[test]
    fn similar_is_symmetric() {
        let pairs = [
            ("Master of Puppets", "Master Of Puppets (Remastered 2017)"),
            ("Abbey Road", "Let It Be"),
            ("Metallica", "Metalica"),
            ("Paranoid", "Paranoid Live"),
            ("", "Anything"),
        ];
        for (a, b) in pairs {
            for threshold in [0.5, ALBUM_THRESHOLD, ARTIST_THRESHOLD] {
                assert_eq!(similar(a, b, threshold), similar(b, a, threshold), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn empty_input_fails_closed() {
        assert!(!similar("", "", ALBUM_THRESHOLD));
        assert!(!similar("", "Abbey Road", 0.0));
        assert!(!similar("(Deluxe)", "[Deluxe]", ALBUM_THRESHOLD));
    }

    #[test]
    fn similarity_ratio_bounds() {
        assert_eq!(similarity_ratio("abbey road", "abbey road"), 1.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert!(similarity_ratio("abc", "xyz") < 0.01);
    }
}
