// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory stand-ins for the platform clients.

use crate::sources::{CatalogApi, SecondaryPlatform, VideoMetadataSource};
use async_trait::async_trait;
use cratedigger_catalog::{
    Album, AlbumRef, Artist, ArtistRef, CatalogError, Page, Playlist, PlaylistCreator,
    Result as CatalogResult, SearchQuery, Track,
};
use cratedigger_platforms::spotify::{
    ExternalIds, Paging, PlaylistItem, Result as SpotifyResult, SpotifyAlbum, SpotifyArtist,
    SpotifyError, SpotifyPlaylist, SpotifyTrack,
};
use cratedigger_platforms::VideoError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn album(id: u64, artist: &str, title: &str) -> Album {
    Album {
        id,
        title: title.to_string(),
        upc: None,
        link: None,
        record_type: Some("album".to_string()),
        release_date: Some("2001-03-12".to_string()),
        available: true,
        artist: Some(ArtistRef {
            id: id * 10,
            name: artist.to_string(),
        }),
        nb_tracks: Some(10),
    }
}

pub fn dated_album(id: u64, artist: &str, title: &str, record_type: &str, date: &str) -> Album {
    Album {
        record_type: Some(record_type.to_string()),
        release_date: Some(date.to_string()),
        ..album(id, artist, title)
    }
}

pub fn track(id: u64, artist: &str, title: &str, album_id: u64) -> Track {
    Track {
        id,
        title: title.to_string(),
        link: None,
        readable: true,
        artist: Some(ArtistRef {
            id: 1,
            name: artist.to_string(),
        }),
        album: Some(AlbumRef {
            id: album_id,
            title: format!("album {album_id}"),
        }),
    }
}

pub fn artist(id: u64, name: &str) -> Artist {
    Artist {
        id,
        name: name.to_string(),
        link: None,
        nb_album: None,
        nb_fan: None,
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub artists: HashMap<u64, Artist>,
    pub albums: HashMap<u64, Album>,
    pub upcs: HashMap<String, u64>,
    pub tracks: HashMap<u64, Track>,
    pub playlists: HashMap<u64, Playlist>,
    pub playlist_tracks: HashMap<u64, Vec<Track>>,
    pub discographies: HashMap<u64, Vec<Album>>,
    /// Search hits keyed by a lowercase substring of the query.
    pub artist_hits: Vec<(String, u64)>,
    pub album_hits: Vec<(String, u64)>,
    pub track_hits: Vec<(String, u64)>,
    /// Lookups of these album IDs fail with a server error.
    pub failing_albums: HashSet<u64>,
    /// Tracks still returned by search whose lookup reports not found.
    pub vanished_tracks: HashSet<u64>,
    /// Playlist pages starting at or past this index fail with a server error.
    pub failing_pages_from: Option<u32>,
    pub searches_fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn with_album(mut self, album: Album) -> Self {
        if let Some(upc) = album.upc.clone() {
            self.upcs.insert(upc, album.id);
        }
        self.albums.insert(album.id, album);
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.insert(track.id, track);
        self
    }

    pub fn with_artist(mut self, artist: Artist, discography: Vec<Album>) -> Self {
        for album in &discography {
            self.albums.entry(album.id).or_insert_with(|| album.clone());
        }
        self.discographies.insert(artist.id, discography);
        self.artists.insert(artist.id, artist);
        self
    }

    pub fn with_playlist(mut self, id: u64, title: &str, tracks: Vec<Track>) -> Self {
        self.playlists.insert(
            id,
            Playlist {
                id,
                title: title.to_string(),
                link: None,
                nb_tracks: Some(tracks.len() as u32),
                creator: Some(PlaylistCreator {
                    id: 5,
                    name: "curator".to_string(),
                }),
            },
        );
        self.playlist_tracks.insert(id, tracks);
        self
    }

    pub fn artist_hit(mut self, needle: &str, id: u64) -> Self {
        self.artist_hits.push((needle.to_lowercase(), id));
        self
    }

    pub fn album_hit(mut self, needle: &str, id: u64) -> Self {
        self.album_hits.push((needle.to_lowercase(), id));
        self
    }

    pub fn track_hit(mut self, needle: &str, id: u64) -> Self {
        self.track_hits.push((needle.to_lowercase(), id));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn hits<T: Clone>(&self, hits: &[(String, u64)], query: &SearchQuery, lookup: &HashMap<u64, T>) -> CatalogResult<Vec<T>> {
        if self.searches_fail {
            return Err(CatalogError::ApiError {
                status: 503,
                message: "busy".to_string(),
            });
        }
        let text = query.query.to_lowercase();
        let limit = query.limit.unwrap_or(25) as usize;
        Ok(hits
            .iter()
            .filter(|(needle, _)| text.contains(needle.as_str()))
            .filter_map(|(_, id)| lookup.get(id).cloned())
            .take(limit)
            .collect())
    }
}

fn missing(what: &str) -> CatalogError {
    CatalogError::NotFound(what.to_string())
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn artist(&self, id: u64) -> CatalogResult<Artist> {
        self.record(format!("artist {id}"));
        self.artists.get(&id).cloned().ok_or_else(|| missing("artist"))
    }

    async fn album(&self, id: u64) -> CatalogResult<Album> {
        self.record(format!("album {id}"));
        if self.failing_albums.contains(&id) {
            return Err(CatalogError::ApiError {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        self.albums.get(&id).cloned().ok_or_else(|| missing("album"))
    }

    async fn album_by_upc(&self, upc: &str) -> CatalogResult<Album> {
        self.record(format!("upc {upc}"));
        self.upcs
            .get(upc)
            .and_then(|id| self.albums.get(id))
            .cloned()
            .ok_or_else(|| missing("upc"))
    }

    async fn track(&self, id: u64) -> CatalogResult<Track> {
        self.record(format!("track {id}"));
        if self.vanished_tracks.contains(&id) {
            return Err(missing("track"));
        }
        self.tracks.get(&id).cloned().ok_or_else(|| missing("track"))
    }

    async fn playlist(&self, id: u64) -> CatalogResult<Playlist> {
        self.record(format!("playlist {id}"));
        self.playlists.get(&id).cloned().ok_or_else(|| missing("playlist"))
    }

    async fn search_artists(&self, query: SearchQuery) -> CatalogResult<Vec<Artist>> {
        self.record(format!("search artist {}", query.query));
        self.hits(&self.artist_hits, &query, &self.artists)
    }

    async fn search_albums(&self, query: SearchQuery) -> CatalogResult<Vec<Album>> {
        self.record(format!("search album {}", query.query));
        self.hits(&self.album_hits, &query, &self.albums)
    }

    async fn search_tracks(&self, query: SearchQuery) -> CatalogResult<Vec<Track>> {
        self.record(format!("search track {}", query.query));
        self.hits(&self.track_hits, &query, &self.tracks)
    }

    async fn artist_albums(&self, artist_id: u64) -> CatalogResult<Vec<Album>> {
        self.record(format!("discography {artist_id}"));
        self.discographies
            .get(&artist_id)
            .cloned()
            .ok_or_else(|| missing("artist"))
    }

    async fn playlist_tracks(&self, playlist_id: u64, index: u32, limit: u32) -> CatalogResult<Page<Track>> {
        self.record(format!("playlist tracks {playlist_id} @{index}"));
        if self.failing_pages_from.is_some_and(|from| index >= from) {
            return Err(CatalogError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        let tracks = self
            .playlist_tracks
            .get(&playlist_id)
            .ok_or_else(|| missing("playlist"))?;
        let start = (index as usize).min(tracks.len());
        let end = (start + limit as usize).min(tracks.len());
        Ok(Page {
            data: tracks[start..end].to_vec(),
            total: Some(tracks.len() as u32),
            next: (end < tracks.len()).then(|| format!("next?index={end}")),
        })
    }
}

pub fn sp_artist(id: &str, name: &str) -> SpotifyArtist {
    SpotifyArtist {
        id: Some(id.to_string()),
        name: name.to_string(),
    }
}

pub fn sp_album(id: &str, artist: &str, title: &str, upc: Option<&str>) -> SpotifyAlbum {
    SpotifyAlbum {
        id: Some(id.to_string()),
        name: title.to_string(),
        artists: vec![sp_artist(&format!("{id}-artist"), artist)],
        external_ids: ExternalIds {
            upc: upc.map(str::to_string),
            isrc: None,
        },
        album_type: Some("album".to_string()),
        release_date: None,
    }
}

pub fn sp_track(id: &str, artist: &SpotifyArtist, album: Option<SpotifyAlbum>) -> SpotifyTrack {
    SpotifyTrack {
        id: Some(id.to_string()),
        name: format!("song {id}"),
        artists: vec![artist.clone()],
        album,
        external_ids: ExternalIds::default(),
    }
}

#[derive(Default)]
pub struct FakeSpotify {
    pub tracks: HashMap<String, SpotifyTrack>,
    pub albums: HashMap<String, SpotifyAlbum>,
    pub artists: HashMap<String, SpotifyArtist>,
    pub artist_albums: HashMap<String, Vec<SpotifyAlbum>>,
    pub playlists: HashMap<String, Vec<PlaylistItem>>,
    /// Items per playlist page.
    pub page_size: usize,
    /// Playlist pages starting at or past this offset fail with a server error.
    pub failing_pages_from: Option<usize>,
    /// Every call fails as if the token exchange had been refused.
    pub rejects_credentials: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSpotify {
    pub fn with_album(mut self, album: SpotifyAlbum) -> Self {
        if let Some(id) = album.id.clone() {
            self.albums.insert(id, album);
        }
        self
    }

    pub fn with_track(mut self, track: SpotifyTrack) -> Self {
        if let Some(id) = track.id.clone() {
            self.tracks.insert(id, track);
        }
        self
    }

    pub fn with_artist(mut self, artist: SpotifyArtist, albums: Vec<SpotifyAlbum>) -> Self {
        if let Some(id) = artist.id.clone() {
            self.artist_albums.insert(id.clone(), albums);
            self.artists.insert(id, artist);
        }
        self
    }

    pub fn with_playlist(mut self, id: &str, tracks: Vec<Option<SpotifyTrack>>) -> Self {
        let items = tracks.into_iter().map(|track| PlaylistItem { track }).collect();
        self.playlists.insert(id.to_string(), items);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> SpotifyResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.rejects_credentials {
            return Err(SpotifyError::Auth("invalid_client".to_string()));
        }
        Ok(())
    }
}

fn sp_missing(what: &str) -> SpotifyError {
    SpotifyError::NotFound(what.to_string())
}

#[async_trait]
impl SecondaryPlatform for FakeSpotify {
    async fn track(&self, id: &str) -> SpotifyResult<SpotifyTrack> {
        self.record(format!("track {id}"))?;
        self.tracks.get(id).cloned().ok_or_else(|| sp_missing(id))
    }

    async fn album(&self, id: &str) -> SpotifyResult<SpotifyAlbum> {
        self.record(format!("album {id}"))?;
        self.albums.get(id).cloned().ok_or_else(|| sp_missing(id))
    }

    async fn artist(&self, id: &str) -> SpotifyResult<SpotifyArtist> {
        self.record(format!("artist {id}"))?;
        self.artists.get(id).cloned().ok_or_else(|| sp_missing(id))
    }

    async fn artist_albums(&self, id: &str, limit: u32) -> SpotifyResult<Vec<SpotifyAlbum>> {
        self.record(format!("artist albums {id}"))?;
        let albums = self.artist_albums.get(id).ok_or_else(|| sp_missing(id))?;
        Ok(albums.iter().take(limit as usize).cloned().collect())
    }

    async fn playlist(&self, id: &str) -> SpotifyResult<SpotifyPlaylist> {
        self.record(format!("playlist {id}"))?;
        self.playlists
            .contains_key(id)
            .then(|| SpotifyPlaylist {
                id: id.to_string(),
                name: format!("mix {id}"),
            })
            .ok_or_else(|| sp_missing(id))
    }

    async fn playlist_tracks(&self, id: &str, cursor: Option<&str>) -> SpotifyResult<Paging<PlaylistItem>> {
        self.record(format!("playlist tracks {id} {}", cursor.unwrap_or("-")))?;
        let items = self.playlists.get(id).ok_or_else(|| sp_missing(id))?;
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0).min(items.len());
        if self.failing_pages_from.is_some_and(|from| start >= from) {
            return Err(SpotifyError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        let page_size = if self.page_size == 0 { 100 } else { self.page_size };
        let end = (start + page_size).min(items.len());
        Ok(Paging {
            items: items[start..end].to_vec(),
            next: (end < items.len()).then(|| end.to_string()),
            total: Some(items.len() as u32),
        })
    }
}

#[derive(Default)]
pub struct FakeVideo {
    pub titles: HashMap<String, String>,
}

impl FakeVideo {
    pub fn with_title(mut self, url: &str, title: &str) -> Self {
        self.titles.insert(url.to_string(), title.to_string());
        self
    }
}

#[async_trait]
impl VideoMetadataSource for FakeVideo {
    async fn title(&self, url: &str, _first_entry: bool) -> Result<String, VideoError> {
        self.titles.get(url).cloned().ok_or(VideoError::MissingTitle)
    }
}
