// SPDX-License-Identifier: GPL-3.0-or-later

//! Link recognition.
//!
//! Each supported platform contributes one [`LinkHandler`]. The registry is
//! a fixed list consulted in order; the first handler that recognises a URL
//! wins, and a URL nobody recognises is `unsupported_platform`.

use crate::errors::{ResolutionError, ResolutionResult};
use cratedigger_domain::{CatalogId, ForeignReference, Platform, ReleaseKind};
use url::Url;

pub trait LinkHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// Recognise a link; `None` means "not mine".
    fn parse_link(&self, url: &Url) -> Option<ForeignReference>;
}

fn reference(platform: Platform, kind: ReleaseKind, id: &str, url: &Url) -> ForeignReference {
    ForeignReference {
        platform,
        kind,
        opaque_id: id.to_string(),
        raw_url: url.to_string(),
    }
}

fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| host == domain || host.ends_with(&format!(".{domain}")))
        .unwrap_or(false)
}

/// First `<kind>/<id>` pair in the path, skipping locale prefixes such as `/us/` or `/intl-de/`.
fn kind_and_id<'a>(url: &'a Url) -> Option<(ReleaseKind, &'a str)> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    segments
        .windows(2)
        .find_map(|pair| ReleaseKind::from_label(pair[0]).map(|kind| (kind, pair[1])))
}

/// Deezer web links: `deezer.com[/<locale>]/{artist|album|track|playlist}/<digits>`.
pub struct DeezerLinks;

impl LinkHandler for DeezerLinks {
    fn platform(&self) -> Platform {
        Platform::Deezer
    }

    fn parse_link(&self, url: &Url) -> Option<ForeignReference> {
        if !host_matches(url, "deezer.com") {
            return None;
        }
        let (kind, id) = kind_and_id(url)?;
        let id = CatalogId::parse_str(id)?;
        Some(reference(Platform::Deezer, kind, &id.to_string(), url))
    }
}

/// Spotify web links and `spotify:<kind>:<id>` URIs.
pub struct SpotifyLinks;

fn is_spotify_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

impl LinkHandler for SpotifyLinks {
    fn platform(&self) -> Platform {
        Platform::Spotify
    }

    fn parse_link(&self, url: &Url) -> Option<ForeignReference> {
        let (kind, id) = if url.scheme() == "spotify" {
            let mut parts = url.path().split(':');
            let kind = ReleaseKind::from_label(parts.next()?)?;
            (kind, parts.next()?)
        } else if host_matches(url, "open.spotify.com") || host_matches(url, "play.spotify.com") {
            kind_and_id(url)?
        } else {
            return None;
        };

        is_spotify_id(id).then(|| reference(Platform::Spotify, kind, id, url))
    }
}

/// YouTube watch, short, `youtu.be` and playlist links.
pub struct YouTubeLinks;

fn is_youtube_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl LinkHandler for YouTubeLinks {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn parse_link(&self, url: &Url) -> Option<ForeignReference> {
        let query = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };
        let first_segment = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .unwrap_or_default()
            .to_string();

        let (kind, id) = if host_matches(url, "youtu.be") {
            (ReleaseKind::Track, first_segment)
        } else if host_matches(url, "youtube.com") {
            match first_segment.as_str() {
                "watch" => (ReleaseKind::Track, query("v")?),
                "shorts" => (
                    ReleaseKind::Track,
                    url.path_segments()?.nth(1).unwrap_or_default().to_string(),
                ),
                "playlist" => (ReleaseKind::Playlist, query("list")?),
                _ => return None,
            }
        } else {
            return None;
        };

        is_youtube_id(&id).then(|| reference(Platform::YouTube, kind, &id, url))
    }
}

/// Ordered set of link handlers.
pub struct LinkRegistry {
    handlers: Vec<Box<dyn LinkHandler>>,
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self {
            handlers: vec![
                Box::new(SpotifyLinks),
                Box::new(YouTubeLinks),
                Box::new(DeezerLinks),
            ],
        }
    }
}

impl LinkRegistry {
    pub fn platforms(&self) -> Vec<Platform> {
        self.handlers.iter().map(|h| h.platform()).collect()
    }

    /// Parse a link. Scheme-less web links (`open.spotify.com/...`) are accepted.
    pub fn parse(&self, raw: &str) -> ResolutionResult<ForeignReference> {
        let raw = raw.trim();
        let url = Url::parse(raw)
            .or_else(|_| Url::parse(&format!("https://{raw}")))
            .map_err(|e| ResolutionError::invalid_input(format!("not a URL: {raw} ({e})")))?;

        self.handlers
            .iter()
            .find_map(|handler| handler.parse_link(&url))
            .ok_or_else(|| ResolutionError::unsupported(format!("no handler recognises {raw}")))
    }
}
