// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Value Objects & IDs
// ============================================================================

/// Numeric identifier of an entity in the primary catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogId(pub u64);

impl CatalogId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Parse a decimal catalog ID, rejecting zero and anything non-numeric.
    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u64>().ok().filter(|id| *id > 0).map(Self)
    }
}

impl From<u64> for CatalogId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    Artist,
    Album,
    Track,
    Playlist,
}

impl ReleaseKind {
    /// Parse the path/URI label used by every supported platform (`album`, `track`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            "playlist" => Some(Self::Playlist),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Artist => write!(f, "artist"),
            Self::Album => write!(f, "album"),
            Self::Track => write!(f, "track"),
            Self::Playlist => write!(f, "playlist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Album,
    Ep,
    Single,
    Track,
    Playlist,
}

impl RecordType {
    /// Map a catalog `record_type` value. Compilations and unknown values count as albums.
    pub fn from_catalog(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ep" => Self::Ep,
            "single" => Self::Single,
            "track" => Self::Track,
            "playlist" => Self::Playlist,
            _ => Self::Album,
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Album => write!(f, "album"),
            Self::Ep => write!(f, "ep"),
            Self::Single => write!(f, "single"),
            Self::Track => write!(f, "track"),
            Self::Playlist => write!(f, "playlist"),
        }
    }
}

/// Which record types an artist discography expansion keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTypeFilter {
    #[default]
    All,
    Album,
    Ep,
    Single,
}

impl RecordTypeFilter {
    pub fn matches(&self, record_type: RecordType) -> bool {
        match self {
            Self::All => true,
            Self::Album => record_type == RecordType::Album,
            Self::Ep => record_type == RecordType::Ep,
            Self::Single => record_type == RecordType::Single,
        }
    }
}

impl std::str::FromStr for RecordTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "album" => Ok(Self::Album),
            "ep" => Ok(Self::Ep),
            "single" => Ok(Self::Single),
            other => Err(format!("unknown record type filter: {other}")),
        }
    }
}

impl std::fmt::Display for RecordTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Album => write!(f, "album"),
            Self::Ep => write!(f, "ep"),
            Self::Single => write!(f, "single"),
        }
    }
}

/// Audio quality requested from the download executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Bitrate {
    #[serde(rename = "128")]
    Mp3_128,
    #[default]
    #[serde(rename = "320")]
    Mp3_320,
    #[serde(rename = "flac", alias = "FLAC")]
    Flac,
}

impl std::str::FromStr for Bitrate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "128" => Ok(Self::Mp3_128),
            "320" => Ok(Self::Mp3_320),
            other if other.eq_ignore_ascii_case("flac") => Ok(Self::Flac),
            other => Err(format!("unsupported bitrate: {other} (expected 128, 320 or flac)")),
        }
    }
}

impl std::fmt::Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mp3_128 => write!(f, "128"),
            Self::Mp3_320 => write!(f, "320"),
            Self::Flac => write!(f, "FLAC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Primary catalog; the only platform whose IDs can be queued.
    Deezer,
    Spotify,
    YouTube,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deezer => write!(f, "deezer"),
            Self::Spotify => write!(f, "spotify"),
            Self::YouTube => write!(f, "youtube"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionErrorKind {
    NotFound,
    Ambiguous,
    GeoBlocked,
    TransientNetwork,
    UnsupportedPlatform,
    ConfigMissing,
    InvalidInput,
}

impl std::fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::GeoBlocked => write!(f, "geo_blocked"),
            Self::TransientNetwork => write!(f, "transient_network"),
            Self::UnsupportedPlatform => write!(f, "unsupported_platform"),
            Self::ConfigMissing => write!(f, "config_missing"),
            Self::InvalidInput => write!(f, "invalid_input"),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Identity of a queued release: one entry per (kind, catalog ID) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseKey {
    pub kind: ReleaseKind,
    pub catalog_id: CatalogId,
}

impl std::fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.catalog_id)
    }
}

/// A release expressed in primary catalog terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRelease {
    pub catalog_id: CatalogId,
    pub kind: ReleaseKind,
    pub artist_name: String,
    pub title: String,
    pub record_type: RecordType,
    pub release_date: Option<NaiveDate>,
    pub source_url: String,
}

impl CanonicalRelease {
    pub fn key(&self) -> ReleaseKey {
        ReleaseKey {
            kind: self.kind,
            catalog_id: self.catalog_id,
        }
    }

    /// True when the release date lies strictly inside the given window.
    /// Releases without a date only pass an unbounded window.
    pub fn released_between(&self, after: Option<NaiveDate>, before: Option<NaiveDate>) -> bool {
        if after.is_none() && before.is_none() {
            return true;
        }
        let Some(date) = self.release_date else {
            return false;
        };
        after.map_or(true, |from| date > from) && before.map_or(true, |to| date < to)
    }
}

impl std::fmt::Display for CanonicalRelease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ReleaseKind::Artist => write!(f, "{} [{}]", self.artist_name, self.key()),
            _ => write!(f, "{} - {} [{}]", self.artist_name, self.title, self.key()),
        }
    }
}

/// A unit of work handed to the download executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub release: CanonicalRelease,
    pub bitrate: Bitrate,
    pub download_path: PathBuf,
}

impl QueueItem {
    pub fn new(release: CanonicalRelease, bitrate: Bitrate, download_path: impl Into<PathBuf>) -> Self {
        Self {
            release,
            bitrate,
            download_path: download_path.into(),
        }
    }

    pub fn key(&self) -> ReleaseKey {
        self.release.key()
    }
}

/// A link or URI on some platform, parsed but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignReference {
    pub platform: Platform,
    pub kind: ReleaseKind,
    pub opaque_id: String,
    pub raw_url: String,
}

impl std::fmt::Display for ForeignReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.platform, self.kind, self.opaque_id)
    }
}

/// One owned album discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub normalized_artist: String,
    pub normalized_album: String,
    pub artist: String,
    pub album: String,
    pub year: Option<u16>,
    pub genre: Option<String>,
    pub path: PathBuf,
}
