// SPDX-License-Identifier: GPL-3.0-or-later

//! Seams between the resolution core and the platform clients.
//!
//! The resolver, extractor and service only see these traits, so tests can
//! substitute in-memory fakes for the network-backed clients.

use async_trait::async_trait;
use cratedigger_catalog::{
    Album, Artist, CatalogClient, Page, Playlist, Result as CatalogResult, SearchQuery, Track,
};
use cratedigger_platforms::spotify::{
    Paging, PlaylistItem, Result as SpotifyResult, SpotifyAlbum, SpotifyArtist, SpotifyPlaylist,
    SpotifyTrack,
};
use cratedigger_platforms::{SpotifyClient, VideoError, YtDlpClient};

/// The primary catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn artist(&self, id: u64) -> CatalogResult<Artist>;
    async fn album(&self, id: u64) -> CatalogResult<Album>;
    async fn album_by_upc(&self, upc: &str) -> CatalogResult<Album>;
    async fn track(&self, id: u64) -> CatalogResult<Track>;
    async fn playlist(&self, id: u64) -> CatalogResult<Playlist>;
    async fn search_artists(&self, query: SearchQuery) -> CatalogResult<Vec<Artist>>;
    async fn search_albums(&self, query: SearchQuery) -> CatalogResult<Vec<Album>>;
    async fn search_tracks(&self, query: SearchQuery) -> CatalogResult<Vec<Track>>;
    /// Every release of an artist.
    async fn artist_albums(&self, artist_id: u64) -> CatalogResult<Vec<Album>>;
    async fn playlist_tracks(&self, playlist_id: u64, index: u32, limit: u32) -> CatalogResult<Page<Track>>;
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn artist(&self, id: u64) -> CatalogResult<Artist> {
        self.get_artist(id).await
    }

    async fn album(&self, id: u64) -> CatalogResult<Album> {
        self.get_album(id).await
    }

    async fn album_by_upc(&self, upc: &str) -> CatalogResult<Album> {
        self.get_album_by_upc(upc).await
    }

    async fn track(&self, id: u64) -> CatalogResult<Track> {
        self.get_track(id).await
    }

    async fn playlist(&self, id: u64) -> CatalogResult<Playlist> {
        self.get_playlist(id).await
    }

    async fn search_artists(&self, query: SearchQuery) -> CatalogResult<Vec<Artist>> {
        Ok(CatalogClient::search_artists(self, query).await?.data)
    }

    async fn search_albums(&self, query: SearchQuery) -> CatalogResult<Vec<Album>> {
        Ok(CatalogClient::search_albums(self, query).await?.data)
    }

    async fn search_tracks(&self, query: SearchQuery) -> CatalogResult<Vec<Track>> {
        Ok(CatalogClient::search_tracks(self, query).await?.data)
    }

    async fn artist_albums(&self, artist_id: u64) -> CatalogResult<Vec<Album>> {
        self.all_artist_albums(artist_id).await
    }

    async fn playlist_tracks(&self, playlist_id: u64, index: u32, limit: u32) -> CatalogResult<Page<Track>> {
        CatalogClient::playlist_tracks(self, playlist_id, index, limit).await
    }
}

/// The secondary platform whose links are translated into catalog releases.
#[async_trait]
pub trait SecondaryPlatform: Send + Sync {
    async fn track(&self, id: &str) -> SpotifyResult<SpotifyTrack>;
    async fn album(&self, id: &str) -> SpotifyResult<SpotifyAlbum>;
    async fn artist(&self, id: &str) -> SpotifyResult<SpotifyArtist>;
    async fn artist_albums(&self, id: &str, limit: u32) -> SpotifyResult<Vec<SpotifyAlbum>>;
    async fn playlist(&self, id: &str) -> SpotifyResult<SpotifyPlaylist>;
    /// One page of playlist items; `cursor` is the previous page's `next` link.
    async fn playlist_tracks(&self, id: &str, cursor: Option<&str>) -> SpotifyResult<Paging<PlaylistItem>>;
}

#[async_trait]
impl SecondaryPlatform for SpotifyClient {
    async fn track(&self, id: &str) -> SpotifyResult<SpotifyTrack> {
        self.get_track(id).await
    }

    async fn album(&self, id: &str) -> SpotifyResult<SpotifyAlbum> {
        self.get_album(id).await
    }

    async fn artist(&self, id: &str) -> SpotifyResult<SpotifyArtist> {
        self.get_artist(id).await
    }

    async fn artist_albums(&self, id: &str, limit: u32) -> SpotifyResult<Vec<SpotifyAlbum>> {
        Ok(SpotifyClient::artist_albums(self, id, limit).await?.items)
    }

    async fn playlist(&self, id: &str) -> SpotifyResult<SpotifyPlaylist> {
        self.get_playlist(id).await
    }

    async fn playlist_tracks(&self, id: &str, cursor: Option<&str>) -> SpotifyResult<Paging<PlaylistItem>> {
        SpotifyClient::playlist_tracks(self, id, cursor).await
    }
}

/// Video platform metadata.
#[async_trait]
pub trait VideoMetadataSource: Send + Sync {
    /// Title of the video, or of the first entry when `first_entry` is set.
    async fn title(&self, url: &str, first_entry: bool) -> Result<String, VideoError>;
}

#[async_trait]
impl VideoMetadataSource for YtDlpClient {
    async fn title(&self, url: &str, first_entry: bool) -> Result<String, VideoError> {
        YtDlpClient::title(self, url, first_entry).await
    }
}
