// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Reference to an artist embedded in album and track payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    pub id: u64,
    pub name: String,
}

/// Artist information from Deezer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    /// Number of albums (only present on lookups and searches).
    #[serde(default)]
    pub nb_album: Option<u32>,
    #[serde(default)]
    pub nb_fan: Option<u64>,
}

/// Reference to an album embedded in track payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumRef {
    pub id: u64,
    pub title: String,
}

/// Album information from Deezer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: u64,
    pub title: String,
    /// Universal product code; only present on full lookups.
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    /// `album`, `ep`, `single` or `compile`.
    #[serde(default)]
    pub record_type: Option<String>,
    /// `YYYY-MM-DD`, or `0000-00-00` when unknown.
    #[serde(default)]
    pub release_date: Option<String>,
    /// False when the album cannot be streamed from the caller's region.
    #[serde(default = "default_true")]
    pub available: bool,
    /// Absent in artist discography listings.
    #[serde(default)]
    pub artist: Option<ArtistRef>,
    #[serde(default)]
    pub nb_tracks: Option<u32>,
}

/// Track information from Deezer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    /// False when the track cannot be streamed from the caller's region.
    #[serde(default = "default_true")]
    pub readable: bool,
    #[serde(default)]
    pub artist: Option<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistCreator {
    pub id: u64,
    pub name: String,
}

/// Playlist information from Deezer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub nb_tracks: Option<u32>,
    #[serde(default)]
    pub creator: Option<PlaylistCreator>,
}

/// Offset-paginated list response (`data`, `total`, `next`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<u32>,
    /// URL of the next page, absent on the last one.
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Search query parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Search query string.
    pub query: String,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub index: Option<u32>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
            index: None,
        }
    }

    /// Build an advanced query such as `artist:"Metallica" album:"Ride the Lightning"`.
    /// Double quotes inside values are dropped so they cannot break the syntax.
    pub fn structured(fields: &[(&str, &str)]) -> Self {
        let query = fields
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(field, value)| format!("{}:\"{}\"", field, value.replace('"', "").trim()))
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(query)
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }
}
