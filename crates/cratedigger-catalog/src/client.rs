// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result, ERROR_CODE_NOT_FOUND, ERROR_CODE_QUOTA};
use crate::models::{Album, Artist, Page, Playlist, SearchQuery, Track};
use crate::rate_limiter::RateLimiter;
use moka::sync::Cache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const USER_AGENT: &str = concat!("cratedigger/", env!("CARGO_PKG_VERSION"));
/// Largest page the listing endpoints hand out.
const MAX_PAGE_SIZE: u32 = 100;

/// Deezer API client with rate limiting.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    album_cache: Cache<u64, Album>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new Deezer client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Look up an artist by catalog ID.
    pub async fn get_artist(&self, id: u64) -> Result<Artist> {
        let url = format!("{}/artist/{}", self.base_url, id);
        self.get(&url).await
    }

    /// Look up an album by catalog ID. Full album payloads are cached for the
    /// lifetime of the client because playlist expansion tends to revisit them.
    pub async fn get_album(&self, id: u64) -> Result<Album> {
        if let Some(cached) = self.album_cache.get(&id) {
            trace!(target: "catalog", album_id = id, "album cache hit");
            return Ok(cached);
        }

        let url = format!("{}/album/{}", self.base_url, id);
        let album: Album = self.get(&url).await?;
        self.album_cache.insert(id, album.clone());
        Ok(album)
    }

    /// Look up an album by its universal product code.
    ///
    /// # Example
    /// ```no_run
    /// # use cratedigger_catalog::CatalogClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = CatalogClient::new()?;
    /// let album = client.get_album_by_upc("724384960650").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_album_by_upc(&self, upc: &str) -> Result<Album> {
        let upc = upc.trim();
        if upc.is_empty() || !upc.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CatalogError::NotFound(format!("invalid upc {upc:?}")));
        }
        let url = format!("{}/album/upc:{}", self.base_url, upc);
        self.get(&url).await
    }

    /// Look up a track by catalog ID.
    pub async fn get_track(&self, id: u64) -> Result<Track> {
        let url = format!("{}/track/{}", self.base_url, id);
        self.get(&url).await
    }

    /// Look up a playlist by catalog ID (metadata only, tracks are paged separately).
    pub async fn get_playlist(&self, id: u64) -> Result<Playlist> {
        let url = format!("{}/playlist/{}", self.base_url, id);
        self.get(&url).await
    }

    /// Search for artists by name.
    ///
    /// # Example
    /// ```no_run
    /// # use cratedigger_catalog::{CatalogClient, SearchQuery};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = CatalogClient::new()?;
    /// let page = client.search_artists(SearchQuery::new("Metallica").limit(5)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search_artists(&self, query: SearchQuery) -> Result<Page<Artist>> {
        let url = self.search_url("artist", &query)?;
        self.get(url.as_str()).await
    }

    /// Search for albums. Accepts plain text or structured `artist:"…" album:"…"` queries.
    pub async fn search_albums(&self, query: SearchQuery) -> Result<Page<Album>> {
        let url = self.search_url("album", &query)?;
        self.get(url.as_str()).await
    }

    /// Search for tracks. Accepts plain text or structured `artist:"…" track:"…"` queries.
    pub async fn search_tracks(&self, query: SearchQuery) -> Result<Page<Track>> {
        let url = self.search_url("track", &query)?;
        self.get(url.as_str()).await
    }

    /// Fetch one page of an artist's releases.
    pub async fn artist_albums(&self, artist_id: u64, index: u32, limit: u32) -> Result<Page<Album>> {
        let url = format!(
            "{}/artist/{}/albums?index={}&limit={}",
            self.base_url,
            artist_id,
            index,
            limit.clamp(1, MAX_PAGE_SIZE)
        );
        self.get(&url).await
    }

    /// Fetch every release of an artist, following pagination to the end.
    pub async fn all_artist_albums(&self, artist_id: u64) -> Result<Vec<Album>> {
        let mut albums = Vec::new();
        let mut index = 0u32;

        loop {
            let page = self.artist_albums(artist_id, index, MAX_PAGE_SIZE).await?;
            let fetched = page.data.len() as u32;
            albums.extend(page.data);

            if page.next.is_none() || fetched == 0 {
                break;
            }
            index += fetched;
        }

        debug!(target: "catalog", artist_id, count = albums.len(), "fetched artist discography");
        Ok(albums)
    }

    /// Fetch one page of a playlist's tracks.
    pub async fn playlist_tracks(&self, playlist_id: u64, index: u32, limit: u32) -> Result<Page<Track>> {
        let url = format!(
            "{}/playlist/{}/tracks?index={}&limit={}",
            self.base_url,
            playlist_id,
            index,
            limit.clamp(1, MAX_PAGE_SIZE)
        );
        self.get(&url).await
    }

    fn search_url(&self, entity: &str, query: &SearchQuery) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/search/{}", self.base_url, entity))
            .map_err(|e| CatalogError::InvalidResponse(e.to_string()))?;

        url.query_pairs_mut().append_pair("q", &query.query);

        if let Some(limit) = query.limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }

        if let Some(index) = query.index {
            url.query_pairs_mut()
                .append_pair("index", &index.to_string());
        }

        Ok(url)
    }

    /// Internal method to perform rate-limited GET requests.
    ///
    /// Deezer reports most failures as HTTP 200 with an `error` envelope, so the
    /// body is inspected before it is deserialized into `T`.
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.acquire().await;

        trace!(target: "catalog", "GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug!(target: "catalog", "response status: {}", status);

        if status == 404 {
            return Err(CatalogError::NotFound(url.to_string()));
        }

        if status == 429 {
            return Err(CatalogError::RateLimitExceeded);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "catalog", "response body: {}", body);

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            CatalogError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = value.get("error") {
            return Err(envelope_error(error, url));
        }

        // Valid JSON that does not fit the model.
        Ok(serde_json::from_value(value)?)
    }
}

fn envelope_error(error: &Value, url: &str) -> CatalogError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let kind = error
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("Exception")
        .to_string();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match code {
        ERROR_CODE_NOT_FOUND => CatalogError::NotFound(url.to_string()),
        ERROR_CODE_QUOTA => CatalogError::RateLimitExceeded,
        _ => CatalogError::Envelope {
            code,
            kind,
            message,
        },
    }
}

/// Builder for configuring a Deezer client.
#[derive(Debug)]
pub struct CatalogClientBuilder {
    base_url: String,
    timeout: Duration,
    rate_limit_interval: Duration,
    cache_capacity: u64,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEEZER_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            rate_limit_interval: Duration::from_millis(100),
            cache_capacity: 1_000,
        }
    }
}

impl CatalogClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit interval between requests.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    /// Maximum number of album payloads kept in memory.
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Build the Deezer client.
    pub fn build(self) -> Result<CatalogClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(CatalogClient {
            client,
            base_url: self.base_url,
            rate_limiter: RateLimiter::new(self.rate_limit_interval),
            album_cache: Cache::new(self.cache_capacity),
        })
    }
}
