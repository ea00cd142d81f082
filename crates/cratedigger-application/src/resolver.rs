// SPDX-License-Identifier: GPL-3.0-or-later

//! Cross-platform resolution with enforced precedence.
//!
//! Foreign references are turned into primary catalog releases. Catalog
//! links resolve directly. Secondary platform albums go through a fixed
//! fallback chain:
//! 1. **Product code**: the album's UPC looked up on the catalog (exact)
//! 2. **Metadata search**: structured `artist` + `album` search (first hit)
//!
//! Secondary tracks resolve to their album; when that fails, and for
//! artist links, the artist's first album is used instead. Video links are
//! resolved from their title: artist + track search, then track-only
//! search, then a loose album search.
//!
//! A step that finds nothing falls through to the next one. Transient
//! failures also fall through, but are remembered so that an exhausted
//! chain reports `transient_network` rather than `not_found`.

use crate::errors::{ResolutionError, ResolutionResult};
use crate::sources::{CatalogApi, SecondaryPlatform, VideoMetadataSource};
use crate::video_title::parse_video_title;
use chrono::NaiveDate;
use cratedigger_catalog::{Album, Artist, CatalogError, Playlist, SearchQuery, Track};
use cratedigger_domain::{
    CanonicalRelease, CatalogId, ForeignReference, Platform, RecordType, ReleaseKind,
    ResolutionErrorKind,
};
use cratedigger_platforms::spotify::{SpotifyAlbum, SpotifyError};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"\s*[(\[][^)\]]*[)\]]").unwrap();
}

/// Which step of the chain produced a catalog match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// The reference already was a catalog ID.
    CatalogLookup,
    /// Exact product code (UPC) lookup.
    ProductCode,
    /// Structured artist + title search.
    MetadataSearch,
    /// The artist's first album, used when a track or artist had nothing better.
    ArtistFallback,
    /// Video title parsed and searched.
    TitleSearch,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogLookup => write!(f, "catalog lookup"),
            Self::ProductCode => write!(f, "product code"),
            Self::MetadataSearch => write!(f, "metadata search"),
            Self::ArtistFallback => write!(f, "artist fallback"),
            Self::TitleSearch => write!(f, "title search"),
        }
    }
}

/// What the fallback chain needs to know about a secondary platform album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumHint {
    pub title: String,
    pub artist: Option<String>,
    pub upc: Option<String>,
}

impl From<&SpotifyAlbum> for AlbumHint {
    fn from(album: &SpotifyAlbum) -> Self {
        Self {
            title: album.name.clone(),
            artist: album.primary_artist().map(|a| a.name.clone()),
            upc: album.external_ids.upc.clone(),
        }
    }
}

impl std::fmt::Display for AlbumHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "{} - {}", artist, self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

pub struct CrossPlatformResolver {
    catalog: Arc<dyn CatalogApi>,
    secondary: Option<Arc<dyn SecondaryPlatform>>,
    video: Option<Arc<dyn VideoMetadataSource>>,
    secondary_missing_reported: AtomicBool,
    /// Set once the secondary platform rejects the configured credentials.
    secondary_disabled: AtomicBool,
}

impl CrossPlatformResolver {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        secondary: Option<Arc<dyn SecondaryPlatform>>,
        video: Option<Arc<dyn VideoMetadataSource>>,
    ) -> Self {
        Self {
            catalog,
            secondary,
            video,
            secondary_missing_reported: AtomicBool::new(false),
            secondary_disabled: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogApi> {
        &self.catalog
    }

    /// The secondary platform client, or `config_missing` when credentials are
    /// absent or were rejected earlier. The warning is logged once per resolver.
    pub fn secondary(&self) -> ResolutionResult<&Arc<dyn SecondaryPlatform>> {
        match &self.secondary {
            Some(_) if self.secondary_disabled.load(Ordering::Relaxed) => Err(ResolutionError::config_missing(
                "spotify credentials were rejected; spotify links are disabled",
            )),
            Some(secondary) => Ok(secondary),
            None => {
                if !self.secondary_missing_reported.swap(true, Ordering::Relaxed) {
                    warn!(
                        target: "resolver",
                        "spotify credentials are not configured; spotify links are disabled"
                    );
                }
                Err(ResolutionError::config_missing(
                    "spotify client_id/client_secret are not configured",
                ))
            }
        }
    }

    /// Classify a secondary platform error. A `config_missing` result disables
    /// the platform for the lifetime of this resolver.
    pub fn secondary_failure(&self, err: &SpotifyError, context: &str) -> ResolutionError {
        let error = ResolutionError::from_spotify(err, context);
        if error.kind == ResolutionErrorKind::ConfigMissing && !self.secondary_disabled.swap(true, Ordering::Relaxed) {
            warn!(target: "resolver", %error, "spotify rejected the configured credentials; spotify links are disabled");
        }
        error
    }

    /// Resolve any recognised reference to a catalog release.
    pub async fn resolve(&self, reference: &ForeignReference) -> ResolutionResult<CanonicalRelease> {
        debug!(target: "resolver", %reference, "resolving reference");

        match reference.platform {
            Platform::Deezer => {
                let id = CatalogId::parse_str(&reference.opaque_id).ok_or_else(|| {
                    ResolutionError::invalid_input(format!(
                        "catalog IDs are numeric, got {:?}",
                        reference.opaque_id
                    ))
                })?;
                self.resolve_catalog(reference.kind, id).await
            }
            Platform::Spotify => self.resolve_secondary(reference.kind, &reference.opaque_id).await,
            Platform::YouTube => self.resolve_video(reference).await,
        }
    }

    /// Look up a catalog entity directly.
    pub async fn resolve_catalog(&self, kind: ReleaseKind, id: CatalogId) -> ResolutionResult<CanonicalRelease> {
        let context = format!("{kind} {id}");
        let catalog_err = |e: CatalogError| ResolutionError::from_catalog(&e, &context);

        match kind {
            ReleaseKind::Artist => artist_release(&self.catalog.artist(id.0).await.map_err(catalog_err)?),
            ReleaseKind::Album => album_release(&self.catalog.album(id.0).await.map_err(catalog_err)?, None),
            ReleaseKind::Track => track_release(&self.catalog.track(id.0).await.map_err(catalog_err)?),
            ReleaseKind::Playlist => {
                playlist_release(&self.catalog.playlist(id.0).await.map_err(catalog_err)?)
            }
        }
    }

    async fn resolve_secondary(&self, kind: ReleaseKind, id: &str) -> ResolutionResult<CanonicalRelease> {
        let secondary = self.secondary()?;
        let context = format!("spotify {kind} {id}");

        match kind {
            ReleaseKind::Album => {
                let album = secondary
                    .album(id)
                    .await
                    .map_err(|e| self.secondary_failure(&e, &context))?;
                self.canonical_album(&AlbumHint::from(&album)).await
            }
            ReleaseKind::Track => self.resolve_secondary_track(id, &context).await,
            ReleaseKind::Artist => self.resolve_secondary_artist(id).await,
            ReleaseKind::Playlist => Err(ResolutionError::invalid_input(format!(
                "{context}: playlists are expanded track by track, not resolved as one release"
            ))),
        }
    }

    async fn resolve_secondary_track(&self, id: &str, context: &str) -> ResolutionResult<CanonicalRelease> {
        let secondary = self.secondary()?;
        let track = secondary
            .track(id)
            .await
            .map_err(|e| self.secondary_failure(&e, context))?;

        let mut last_error = None;

        if let Some(album) = track.album.as_ref() {
            let hint = match album.id.as_deref() {
                // Embedded albums are simplified objects without a UPC.
                Some(album_id) => match secondary.album(album_id).await {
                    Ok(full) => AlbumHint::from(&full),
                    Err(e) => {
                        debug!(target: "resolver", album_id, error = %e, "full album fetch failed, using embedded metadata");
                        AlbumHint::from(album)
                    }
                },
                None => AlbumHint::from(album),
            };

            match self.canonical_album(&hint).await {
                Ok(release) => return Ok(release),
                Err(e) if e.kind == ResolutionErrorKind::GeoBlocked => return Err(e),
                Err(e) => {
                    debug!(target: "resolver", track = %track.name, error = %e, "track album unresolved, trying artist fallback");
                    last_error = Some(e);
                }
            }
        }

        let Some(artist_id) = track.primary_artist().and_then(|a| a.id.as_deref()) else {
            return Err(last_error.unwrap_or_else(|| {
                ResolutionError::not_found(format!("{context}: track has neither album nor artist"))
            }));
        };

        match self.resolve_secondary_artist(artist_id).await {
            Ok(release) => Ok(release),
            Err(e) => Err(match last_error {
                Some(previous) if previous.is_transient() => previous,
                _ => e,
            }),
        }
    }

    /// An artist link resolves to the artist's first album. When the artist has
    /// no albums on the secondary platform, the artist itself is searched.
    async fn resolve_secondary_artist(&self, id: &str) -> ResolutionResult<CanonicalRelease> {
        let secondary = self.secondary()?;
        let context = format!("spotify artist {id}");

        let albums = secondary
            .artist_albums(id, 1)
            .await
            .map_err(|e| self.secondary_failure(&e, &context))?;

        if let Some(first) = albums.first() {
            let hint = match first.id.as_deref() {
                Some(album_id) => secondary
                    .album(album_id)
                    .await
                    .map(|full| AlbumHint::from(&full))
                    .unwrap_or_else(|_| AlbumHint::from(first)),
                None => AlbumHint::from(first),
            };
            info!(target: "resolver", %context, album = %hint, strategy = %ResolutionStrategy::ArtistFallback, "using artist's first album");
            return self.canonical_album(&hint).await;
        }

        let artist = secondary
            .artist(id)
            .await
            .map_err(|e| self.secondary_failure(&e, &context))?;
        let hits = self
            .catalog
            .search_artists(SearchQuery::new(&artist.name).limit(1))
            .await
            .map_err(|e| ResolutionError::from_catalog(&e, &context))?;

        match hits.first() {
            Some(hit) => artist_release(hit),
            None => Err(ResolutionError::not_found(format!(
                "{context}: no catalog artist named {:?}",
                artist.name
            ))),
        }
    }

    /// Run the fallback chain and fetch the resulting catalog album.
    pub async fn canonical_album(&self, hint: &AlbumHint) -> ResolutionResult<CanonicalRelease> {
        let (id, strategy) = self.album_id_for(hint).await?;
        let album = self
            .catalog
            .album(id.0)
            .await
            .map_err(|e| ResolutionError::from_catalog(&e, &format!("album {id}")))?;

        info!(target: "resolver", %hint, catalog_id = %id, %strategy, "resolved secondary album");
        album_release(&album, hint.artist.as_deref())
    }

    /// Catalog album ID for a secondary album: product code first, then metadata search.
    pub async fn album_id_for(&self, hint: &AlbumHint) -> ResolutionResult<(CatalogId, ResolutionStrategy)> {
        let mut transient = None;

        if let Some(id) = self.try_product_code(hint, &mut transient).await {
            return Ok((id, ResolutionStrategy::ProductCode));
        }

        debug!(target: "resolver", %hint, "product code lookup unavailable, falling back to metadata search");

        if let Some(id) = self.try_metadata_search(hint, &mut transient).await {
            return Ok((id, ResolutionStrategy::MetadataSearch));
        }

        warn!(target: "resolver", %hint, "all album resolution strategies exhausted");
        Err(transient.unwrap_or_else(|| {
            ResolutionError::not_found(format!("no catalog album matches {hint}"))
        }))
    }

    async fn try_product_code(
        &self,
        hint: &AlbumHint,
        transient: &mut Option<ResolutionError>,
    ) -> Option<CatalogId> {
        let upc = hint.upc.as_deref().map(str::trim).filter(|u| !u.is_empty())?;

        // Secondary platforms zero-pad UPCs to 13 digits; the catalog often stores 12.
        let mut candidates = vec![upc];
        let unpadded = upc.trim_start_matches('0');
        if unpadded != upc && !unpadded.is_empty() {
            candidates.push(unpadded);
        }

        for candidate in candidates {
            match self.catalog.album_by_upc(candidate).await {
                Ok(album) => return Some(CatalogId(album.id)),
                Err(e) if e.is_not_found() => {
                    debug!(target: "resolver", upc = candidate, "no catalog album for product code");
                }
                Err(e) => {
                    debug!(target: "resolver", upc = candidate, error = %e, "product code lookup failed");
                    if e.is_transient() {
                        *transient = Some(ResolutionError::from_catalog(&e, &format!("upc {candidate}")));
                    }
                }
            }
        }
        None
    }

    async fn try_metadata_search(
        &self,
        hint: &AlbumHint,
        transient: &mut Option<ResolutionError>,
    ) -> Option<CatalogId> {
        let artist = hint.artist.as_deref().unwrap_or_default();
        let mut titles = vec![hint.title.trim().to_string()];
        let stripped = BRACKETED.replace_all(&hint.title, "").trim().to_string();
        if !stripped.is_empty() && stripped != titles[0] {
            titles.push(stripped);
        }

        for title in titles.iter().filter(|t| !t.is_empty()) {
            let query = SearchQuery::structured(&[("artist", artist), ("album", title.as_str())]).limit(1);
            match self.catalog.search_albums(query).await {
                Ok(hits) => {
                    if let Some(hit) = hits.first() {
                        return Some(CatalogId(hit.id));
                    }
                    debug!(target: "resolver", artist, title = %title, "metadata search returned nothing");
                }
                Err(e) => {
                    debug!(target: "resolver", artist, title = %title, error = %e, "metadata search failed");
                    if e.is_transient() {
                        *transient = Some(ResolutionError::from_catalog(&e, "album search"));
                    }
                }
            }
        }
        None
    }

    async fn resolve_video(&self, reference: &ForeignReference) -> ResolutionResult<CanonicalRelease> {
        let video = self
            .video
            .as_ref()
            .ok_or_else(|| ResolutionError::config_missing("no video metadata source configured"))?;

        let context = format!("youtube {} {}", reference.kind, reference.opaque_id);
        let title = video
            .title(&reference.raw_url, reference.kind == ReleaseKind::Playlist)
            .await
            .map_err(|e| ResolutionError::from_video(&e, &context))?;
        let parsed = parse_video_title(&title)
            .ok_or_else(|| ResolutionError::not_found(format!("{context}: unusable title {title:?}")))?;

        debug!(target: "resolver", %title, artist = ?parsed.artist, track = %parsed.track, "parsed video title");

        let mut transient = None;
        let mut queries = Vec::new();
        if let Some(artist) = parsed.artist.as_deref() {
            queries.push(SearchQuery::structured(&[("artist", artist), ("track", parsed.track.as_str())]));
        }
        queries.push(SearchQuery::new(parsed.track.clone()));

        for query in queries {
            let Some(hit) = self.first_track(query, &mut transient).await else {
                continue;
            };
            match self.catalog.track(hit.id).await {
                Ok(track) => {
                    info!(target: "resolver", %context, catalog_id = track.id, strategy = %ResolutionStrategy::TitleSearch, "resolved video to track");
                    return track_release(&track);
                }
                Err(e) => {
                    debug!(target: "resolver", catalog_id = hit.id, error = %e, "track lookup failed, trying next search");
                    if e.is_transient() {
                        transient = Some(ResolutionError::from_catalog(&e, &format!("track {}", hit.id)));
                    }
                }
            }
        }

        let loose = match parsed.artist.as_deref() {
            Some(artist) => format!("{} {}", artist, parsed.track),
            None => parsed.track.clone(),
        };
        match self.catalog.search_albums(SearchQuery::new(loose).limit(1)).await {
            Ok(hits) => {
                if let Some(hit) = hits.first() {
                    match self.catalog.album(hit.id).await {
                        Ok(album) => {
                            info!(target: "resolver", %context, catalog_id = album.id, "resolved video to album");
                            return album_release(&album, parsed.artist.as_deref());
                        }
                        Err(e) => {
                            debug!(target: "resolver", catalog_id = hit.id, error = %e, "album lookup failed");
                            if e.is_transient() {
                                transient = Some(ResolutionError::from_catalog(&e, &format!("album {}", hit.id)));
                            }
                        }
                    }
                }
            }
            Err(e) if e.is_transient() => {
                transient = Some(ResolutionError::from_catalog(&e, "album search"));
            }
            Err(e) => debug!(target: "resolver", error = %e, "loose album search failed"),
        }

        Err(transient.unwrap_or_else(|| {
            ResolutionError::not_found(format!("{context}: nothing in the catalog matches {title:?}"))
        }))
    }

    async fn first_track(&self, query: SearchQuery, transient: &mut Option<ResolutionError>) -> Option<Track> {
        let query = query.limit(1);
        let text = query.query.clone();
        match self.catalog.search_tracks(query).await {
            Ok(hits) => {
                if hits.is_empty() {
                    debug!(target: "resolver", query = %text, "track search returned nothing");
                }
                hits.into_iter().next()
            }
            Err(e) => {
                debug!(target: "resolver", query = %text, error = %e, "track search failed");
                if e.is_transient() {
                    *transient = Some(ResolutionError::from_catalog(&e, "track search"));
                }
                None
            }
        }
    }
}

fn parse_release_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

fn required_name(name: &str, what: &str) -> ResolutionResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ResolutionError::not_found(format!("{what} has no name")));
    }
    Ok(name.to_string())
}

/// Validate a catalog album. `artist_fallback` covers listings that omit the artist.
pub fn album_release(album: &Album, artist_fallback: Option<&str>) -> ResolutionResult<CanonicalRelease> {
    if !album.available {
        return Err(ResolutionError::geo_blocked(format!(
            "album {} ({}) is not available in your country",
            album.id, album.title
        )));
    }

    let artist = album
        .artist
        .as_ref()
        .map(|a| a.name.as_str())
        .or(artist_fallback)
        .unwrap_or_default();

    Ok(CanonicalRelease {
        catalog_id: CatalogId(album.id),
        kind: ReleaseKind::Album,
        artist_name: required_name(artist, &format!("artist of album {}", album.id))?,
        title: required_name(&album.title, &format!("album {}", album.id))?,
        record_type: album
            .record_type
            .as_deref()
            .map(RecordType::from_catalog)
            .unwrap_or(RecordType::Album),
        release_date: parse_release_date(album.release_date.as_deref()),
        source_url: album
            .link
            .clone()
            .unwrap_or_else(|| format!("https://www.deezer.com/album/{}", album.id)),
    })
}

pub fn track_release(track: &Track) -> ResolutionResult<CanonicalRelease> {
    if !track.readable {
        return Err(ResolutionError::geo_blocked(format!(
            "track {} ({}) is not available in your country",
            track.id, track.title
        )));
    }

    let artist = track.artist.as_ref().map(|a| a.name.as_str()).unwrap_or_default();
    Ok(CanonicalRelease {
        catalog_id: CatalogId(track.id),
        kind: ReleaseKind::Track,
        artist_name: required_name(artist, &format!("artist of track {}", track.id))?,
        title: required_name(&track.title, &format!("track {}", track.id))?,
        record_type: RecordType::Track,
        release_date: None,
        source_url: track
            .link
            .clone()
            .unwrap_or_else(|| format!("https://www.deezer.com/track/{}", track.id)),
    })
}

/// Artist releases carry the artist name in both name fields.
pub fn artist_release(artist: &Artist) -> ResolutionResult<CanonicalRelease> {
    let name = required_name(&artist.name, &format!("artist {}", artist.id))?;
    Ok(CanonicalRelease {
        catalog_id: CatalogId(artist.id),
        kind: ReleaseKind::Artist,
        artist_name: name.clone(),
        title: name,
        record_type: RecordType::Album,
        release_date: None,
        source_url: artist
            .link
            .clone()
            .unwrap_or_else(|| format!("https://www.deezer.com/artist/{}", artist.id)),
    })
}

pub fn playlist_release(playlist: &Playlist) -> ResolutionResult<CanonicalRelease> {
    Ok(CanonicalRelease {
        catalog_id: CatalogId(playlist.id),
        kind: ReleaseKind::Playlist,
        artist_name: playlist
            .creator
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_default(),
        title: required_name(&playlist.title, &format!("playlist {}", playlist.id))?,
        record_type: RecordType::Playlist,
        release_date: None,
        source_url: playlist
            .link
            .clone()
            .unwrap_or_else(|| format!("https://www.deezer.com/playlist/{}", playlist.id)),
    })
}
