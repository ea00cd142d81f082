// SPDX-License-Identifier: GPL-3.0-or-later

//! Index of albums already present in a local music library.
//!
//! The library is expected to follow a `genre/alpha/artist/album` layout,
//! with album folders optionally prefixed by a year (`1986 - Master Of Puppets`).
//! The folder names are authoritative; the first audio file in each album
//! folder contributes a second, filename-derived entry when it names a
//! different artist or album, which catches folders that were renamed by hand.

use crate::text::{normalize, similar_normalized, MatchThresholds};
use cratedigger_domain::{CanonicalRelease, CollectionEntry, ReleaseKind};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "aac", "ogg", "wma", "wav", "ape", "opus"];

lazy_static! {
    // Pattern: YYYY - Album
    static ref YEAR_PREFIXED_FOLDER: Regex = Regex::new(r"^(?P<year>\d{4})\s*-\s*(?P<album>.+)$").unwrap();

    // Leading track number: "01 - ", "1. ", "07 "
    static ref TRACK_NUMBER_PREFIX: Regex = Regex::new(r"^\d{1,3}[\s.\-]+").unwrap();

    // Pattern: Artist - Album - Title
    static ref PATTERN_ARTIST_ALBUM_TITLE: Regex =
        Regex::new(r"^(?P<artist>[^-]+)\s*-\s*(?P<album>[^-]+)\s*-\s*.+$").unwrap();

    // Pattern: Artist - Title (album implicit from folder)
    static ref PATTERN_ARTIST_TITLE: Regex = Regex::new(r"^(?P<artist>[^-]+)\s*-\s*.+$").unwrap();
}

/// Summary counts for a built index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub artists: usize,
    pub albums: usize,
    pub album_folders: usize,
    /// Album folders per top-level genre folder.
    pub genres: BTreeMap<String, usize>,
}

/// In-memory index keyed by normalized artist, then normalized album.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    root: PathBuf,
    artists: BTreeMap<String, BTreeMap<String, CollectionEntry>>,
    album_folders: usize,
    genres: BTreeMap<String, usize>,
    thresholds: MatchThresholds,
}

impl CollectionIndex {
    /// Scan `root` with the default match thresholds.
    pub fn build(root: impl AsRef<Path>) -> Self {
        Self::build_with_thresholds(root, MatchThresholds::default())
    }

    /// Scan `root`. A missing or unreadable root yields an empty index;
    /// unreadable subfolders are skipped. Neither is fatal.
    pub fn build_with_thresholds(root: impl AsRef<Path>, thresholds: MatchThresholds) -> Self {
        let root = root.as_ref();
        let mut index = Self {
            root: root.to_path_buf(),
            thresholds,
            ..Self::default()
        };

        if !root.is_dir() {
            warn!(target: "collection", root = %root.display(), "collection root is not a readable directory");
            return index;
        }

        for genre_dir in visible_subdirs(root) {
            let genre = file_name(&genre_dir);
            for alpha_dir in visible_subdirs(&genre_dir) {
                for artist_dir in visible_subdirs(&alpha_dir) {
                    index.scan_artist(&artist_dir, &genre);
                }
            }
        }

        info!(
            target: "collection",
            root = %root.display(),
            album_folders = index.album_folders,
            artists = index.artists.len(),
            "collection index built"
        );
        index
    }

    fn scan_artist(&mut self, artist_dir: &Path, genre: &str) {
        let artist = file_name(artist_dir);

        for album_dir in visible_subdirs(artist_dir) {
            let (year, album) = parse_album_folder(&file_name(&album_dir));
            self.album_folders += 1;
            *self.genres.entry(genre.to_string()).or_default() += 1;

            let folder_entry = CollectionEntry {
                normalized_artist: normalize(&artist),
                normalized_album: normalize(&album),
                artist: artist.clone(),
                album: album.clone(),
                year,
                genre: Some(genre.to_string()),
                path: album_dir.clone(),
            };
            self.insert(folder_entry, true);

            let Some(stem) = first_audio_stem(&album_dir) else {
                continue;
            };
            let (file_artist, file_album) = parse_audio_filename(&stem, &artist, &album);
            let file_entry = CollectionEntry {
                normalized_artist: normalize(&file_artist),
                normalized_album: normalize(&file_album),
                artist: file_artist,
                album: file_album,
                year,
                genre: Some(genre.to_string()),
                path: album_dir.clone(),
            };
            self.insert(file_entry, false);
        }
    }

    /// Folder-derived entries replace existing keys; filename-derived ones only fill gaps.
    fn insert(&mut self, entry: CollectionEntry, overwrite: bool) {
        if entry.normalized_artist.is_empty() || entry.normalized_album.is_empty() {
            debug!(
                target: "collection",
                path = %entry.path.display(),
                "skipping entry whose name normalizes to nothing"
            );
            return;
        }

        let albums = self.artists.entry(entry.normalized_artist.clone()).or_default();
        if overwrite || !albums.contains_key(&entry.normalized_album) {
            albums.insert(entry.normalized_album.clone(), entry);
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
    }

    /// Locate an owned album, widening the search in three tiers:
    /// exact keys, then a fuzzy album under the exact artist, then a fuzzy
    /// artist with an exact or fuzzy album. Blank names never match.
    pub fn find(&self, artist: &str, album: &str) -> Option<&CollectionEntry> {
        let artist = normalize(artist);
        let album = normalize(album);
        if artist.is_empty() || album.is_empty() {
            return None;
        }

        if let Some(albums) = self.artists.get(&artist) {
            if let Some(entry) = albums.get(&album) {
                return Some(entry);
            }
            if let Some(entry) = self.fuzzy_album(albums, &album) {
                return Some(entry);
            }
        }

        self.artists
            .iter()
            .filter(|(candidate, _)| similar_normalized(&artist, candidate, self.thresholds.artist))
            .find_map(|(_, albums)| albums.get(&album).or_else(|| self.fuzzy_album(albums, &album)))
    }

    fn fuzzy_album<'a>(
        &self,
        albums: &'a BTreeMap<String, CollectionEntry>,
        album: &str,
    ) -> Option<&'a CollectionEntry> {
        albums
            .iter()
            .find(|(candidate, _)| similar_normalized(album, candidate, self.thresholds.album))
            .map(|(_, entry)| entry)
    }

    pub fn is_owned(&self, artist: &str, album: &str) -> bool {
        self.find(artist, album).is_some()
    }

    /// Exact-key lookup, without any fuzzy widening.
    pub fn get_info(&self, artist: &str, album: &str) -> Option<&CollectionEntry> {
        self.artists
            .get(&normalize(artist))
            .and_then(|albums| albums.get(&normalize(album)))
    }

    /// Split releases into (not owned, owned). Only album releases can be owned.
    pub fn partition_owned(
        &self,
        releases: Vec<CanonicalRelease>,
    ) -> (Vec<CanonicalRelease>, Vec<CanonicalRelease>) {
        releases.into_iter().partition(|release| {
            !(release.kind == ReleaseKind::Album && self.is_owned(&release.artist_name, &release.title))
        })
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            artists: self.artists.len(),
            albums: self.artists.values().map(BTreeMap::len).sum(),
            album_folders: self.album_folders,
            genres: self.genres.clone(),
        }
    }
}

/// Split `YYYY - Album` folder names; other names are the album as-is.
fn parse_album_folder(name: &str) -> (Option<u16>, String) {
    if let Some(caps) = YEAR_PREFIXED_FOLDER.captures(name) {
        let year = caps["year"].parse().ok();
        return (year, caps["album"].trim().to_string());
    }
    (None, name.trim().to_string())
}

/// Recover (artist, album) from an audio file stem, falling back to the folder names.
fn parse_audio_filename(stem: &str, folder_artist: &str, folder_album: &str) -> (String, String) {
    let stem = TRACK_NUMBER_PREFIX.replace(stem, "");

    if let Some(caps) = PATTERN_ARTIST_ALBUM_TITLE.captures(&stem) {
        return (caps["artist"].trim().to_string(), caps["album"].trim().to_string());
    }

    if let Some(caps) = PATTERN_ARTIST_TITLE.captures(&stem) {
        return (caps["artist"].trim().to_string(), folder_album.to_string());
    }

    (folder_artist.to_string(), folder_album.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true)
}

/// Non-hidden subdirectories in name order. Read errors are logged and yield nothing.
fn visible_subdirs(directory: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(target: "collection", path = %directory.display(), error = %err, "cannot read directory");
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| !is_hidden(path))
        .collect();
    dirs.sort();
    dirs
}

/// Stem of the first audio file (in name order) directly inside `album_dir`.
fn first_audio_stem(album_dir: &Path) -> Option<String> {
    let entries = fs::read_dir(album_dir).ok()?;
    let mut audio: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    audio.sort();
    audio
        .first()
        .and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
}
