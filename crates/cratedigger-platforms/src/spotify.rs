// SPDX-License-Identifier: GPL-3.0-or-later

//! Spotify Web API client using the client-credentials flow.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Tokens are refreshed this long before Spotify would reject them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const PLAYLIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token exchange failed: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from Spotify API: {0}")]
    InvalidResponse(String),
}

impl SpotifyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited | Self::InvalidResponse(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Auth(_) | Self::NotFound(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpotifyArtist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExternalIds {
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    /// Only present on full album objects.
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl SpotifyAlbum {
    pub fn primary_artist(&self) -> Option<&SpotifyArtist> {
        self.artists.first()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpotifyTrack {
    /// Null for local files added to a playlist.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    /// Absent for podcast episodes.
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

impl SpotifyTrack {
    pub fn primary_artist(&self) -> Option<&SpotifyArtist> {
        self.artists.first()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<SpotifyTrack>,
}

/// Cursor-paginated list response (`items`, `next`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Spotify API client. The access token is fetched lazily and reused until
/// shortly before it expires.
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl SpotifyClient {
    /// Create a client against the public Spotify endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Self::builder(client_id, client_secret).build()
    }

    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> SpotifyClientBuilder {
        SpotifyClientBuilder {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base: SPOTIFY_API_BASE.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub async fn get_track(&self, id: &str) -> Result<SpotifyTrack> {
        let url = format!("{}/tracks/{}", self.api_base, id);
        self.get(&url).await
    }

    pub async fn get_album(&self, id: &str) -> Result<SpotifyAlbum> {
        let url = format!("{}/albums/{}", self.api_base, id);
        self.get(&url).await
    }

    pub async fn get_artist(&self, id: &str) -> Result<SpotifyArtist> {
        let url = format!("{}/artists/{}", self.api_base, id);
        self.get(&url).await
    }

    /// Albums and singles of an artist, in the order Spotify returns them.
    pub async fn artist_albums(&self, id: &str, limit: u32) -> Result<Paging<SpotifyAlbum>> {
        let url = format!(
            "{}/artists/{}/albums?include_groups=album,single&limit={}",
            self.api_base,
            id,
            limit.clamp(1, 50)
        );
        self.get(&url).await
    }

    pub async fn get_playlist(&self, id: &str) -> Result<SpotifyPlaylist> {
        let url = format!("{}/playlists/{}?fields=id,name", self.api_base, id);
        self.get(&url).await
    }

    /// One page of playlist items. Pass the previous page's `next` URL as
    /// `cursor` to continue; `None` starts from the first page.
    pub async fn playlist_tracks(&self, id: &str, cursor: Option<&str>) -> Result<Paging<PlaylistItem>> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => format!(
                "{}/playlists/{}/tracks?limit={}",
                self.api_base, id, PLAYLIST_PAGE_SIZE
            ),
        };
        self.get(&url).await
    }

    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        debug!(target: "spotify", "requesting client-credentials token");
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "spotify", %status, "token exchange rejected");
            return Err(SpotifyError::Auth(format!("{status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::Auth(format!("malformed token response: {e}")))?;

        let value = token.access_token.clone();
        *guard = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        // A 401 usually means the cached token was revoked early; refresh once.
        for attempt in 0..2 {
            let token = self.access_token().await?;
            trace!(target: "spotify", attempt, "GET {}", url);

            let response = self.client.get(url).bearer_auth(&token).send().await?;
            let status = response.status();

            match status {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    debug!(target: "spotify", "access token rejected, refreshing");
                    self.token.lock().await.take();
                    continue;
                }
                StatusCode::NOT_FOUND => return Err(SpotifyError::NotFound(url.to_string())),
                StatusCode::TOO_MANY_REQUESTS => return Err(SpotifyError::RateLimited),
                s if !s.is_success() => {
                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(SpotifyError::Api {
                        status: s.as_u16(),
                        message,
                    });
                }
                _ => {}
            }

            let body = response.text().await?;
            return serde_json::from_str(&body)
                .map_err(|e| SpotifyError::InvalidResponse(format!("Failed to parse response: {e}")));
        }

        Err(SpotifyError::Auth("access token rejected twice".to_string()))
    }
}

/// Builder for configuring a Spotify client.
#[derive(Debug)]
pub struct SpotifyClientBuilder {
    client_id: String,
    client_secret: String,
    api_base: String,
    token_url: String,
    timeout: Duration,
}

impl SpotifyClientBuilder {
    /// Set a custom API base URL (useful for testing with mock servers).
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom token endpoint (useful for testing with mock servers).
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("cratedigger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(SpotifyClient {
            client,
            api_base: self.api_base,
            token_url: self.token_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            token: Mutex::new(None),
        })
    }
}
