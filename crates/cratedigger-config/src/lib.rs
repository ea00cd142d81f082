// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use cratedigger_domain::{Bitrate, RecordTypeFilter};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeezerConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Deezer allows 50 requests per 5 seconds.
    pub min_request_interval_ms: u64,
    /// Number of artist candidates inspected for `artist - album` queries.
    pub query_limit: u32,
    pub page_size: u32,
    pub page_delay_ms: u64,
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
            min_request_interval_ms: 100,
            query_limit: 5,
            page_size: 100,
            page_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub token_url: Option<String>,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: None,
            token_url: None,
            timeout_secs: 10,
            page_delay_ms: 100,
        }
    }
}

impl SpotifyConfig {
    /// Client credentials, if both halves are present and non-blank.
    pub fn credentials(&self) -> Option<(String, String)> {
        let id = self.client_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let secret = self
            .client_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((id.to_string(), secret.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    pub ytdlp_path: String,
    pub timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub root: Option<PathBuf>,
    pub album_threshold: f64,
    pub artist_threshold: f64,
    /// Drop releases that are already present in the collection before queueing.
    pub skip_owned: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            root: None,
            album_threshold: 0.85,
            artist_threshold: 0.90,
            skip_owned: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub bitrate: Bitrate,
    pub download_path: PathBuf,
    pub record_type: RecordTypeFilter,
    /// Exclusive lower bound for discography expansion.
    pub release_from: Option<NaiveDate>,
    /// Exclusive upper bound for discography expansion.
    pub release_to: Option<NaiveDate>,
    pub expand_playlists: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            bitrate: Bitrate::Mp3_320,
            download_path: PathBuf::from("downloads"),
            record_type: RecordTypeFilter::All,
            release_from: None,
            release_to: None,
            expand_playlists: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub deezer: DeezerConfig,
    pub spotify: SpotifyConfig,
    pub youtube: YoutubeConfig,
    pub collection: CollectionConfig,
    pub queue: QueueConfig,
    pub batch: BatchConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: CRATEDIGGER_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("CRATEDIGGER_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(
        target: "config",
        spotify_enabled = config.spotify.credentials().is_some(),
        collection = ?config.collection.root,
        "configuration loaded"
    );
    Ok(config)
}
