// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry points used by the command line: single inputs, batch files and
//! playlists, all feeding one shared [`ResolutionQueue`].

use crate::collection::CollectionIndex;
use crate::errors::{ResolutionError, ResolutionResult};
use crate::extractor::{ExtractorSettings, PlaylistExtraction, PlaylistExtractor};
use crate::links::LinkRegistry;
use crate::queue::{QueueDefaults, ResolutionQueue};
use crate::resolver::{album_release, CrossPlatformResolver};
use crate::sources::{CatalogApi, SecondaryPlatform, VideoMetadataSource};
use crate::text::{normalize, similar_normalized, MatchThresholds};
use anyhow::Context;
use chrono::NaiveDate;
use cratedigger_catalog::{CatalogClient, SearchQuery};
use cratedigger_config::AppConfig;
use cratedigger_domain::{
    CanonicalRelease, CatalogId, ForeignReference, Platform, QueueItem, RecordTypeFilter,
    ReleaseKind,
};
use cratedigger_platforms::{SpotifyClient, YtDlpClient};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A classified user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveInput {
    Link(String),
    Catalog { kind: ReleaseKind, id: CatalogId },
    ArtistAlbum { artist: String, album: String },
    Artist(String),
}

impl ResolveInput {
    pub fn parse(input: &str) -> ResolutionResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ResolutionError::invalid_input("empty input"));
        }

        let looks_like_bare_link =
            !input.contains(char::is_whitespace) && input.contains('/') && input.contains('.');
        if input.contains("://") || input.starts_with("spotify:") || looks_like_bare_link {
            return Ok(Self::Link(input.to_string()));
        }

        if let Some((label, id)) = input.split_once(':') {
            if let (Some(kind), Some(id)) = (ReleaseKind::from_label(label.trim()), CatalogId::parse_str(id.trim())) {
                return Ok(Self::Catalog { kind, id });
            }
        }

        if input.chars().all(|c| c.is_ascii_digit()) {
            let id = CatalogId::parse_str(input)
                .ok_or_else(|| ResolutionError::invalid_input(format!("invalid catalog ID {input}")))?;
            return Ok(Self::Catalog {
                kind: ReleaseKind::Album,
                id,
            });
        }

        if let Some((artist, album)) = input.split_once(" - ") {
            let (artist, album) = (artist.trim(), album.trim());
            if artist.is_empty() || album.is_empty() {
                return Err(ResolutionError::invalid_input(format!(
                    "expected \"artist - album\", got {input:?}"
                )));
            }
            return Ok(Self::ArtistAlbum {
                artist: artist.to_string(),
                album: album.to_string(),
            });
        }

        Ok(Self::Artist(input.to_string()))
    }
}

/// Result of resolving one input.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    pub input: String,
    /// Items newly admitted to the queue by this input.
    pub queued: Vec<QueueItem>,
    /// Releases already in the queue.
    pub duplicates: usize,
    /// Releases skipped because the collection already has them.
    pub owned: Vec<CanonicalRelease>,
    /// Failures that did not stop the rest of the input (a playlist album, a discography entry).
    pub partial_failures: Vec<ResolutionError>,
    pub error: Option<ResolutionError>,
}

impl ResolutionOutcome {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
            ..Self::default()
        }
    }

    fn failed(input: &str, error: ResolutionError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(input)
        }
    }

    /// First queued item.
    pub fn item(&self) -> Option<&QueueItem> {
        self.queued.first()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub defaults: QueueDefaults,
    /// Artist candidates considered for "artist - album" inputs.
    pub query_limit: u32,
    pub record_type: RecordTypeFilter,
    pub release_from: Option<NaiveDate>,
    pub release_to: Option<NaiveDate>,
    pub expand_playlists: bool,
    pub skip_owned: bool,
    pub thresholds: MatchThresholds,
    pub max_workers: usize,
    pub extractor: ExtractorSettings,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            defaults: QueueDefaults::from_config(&config.queue),
            query_limit: config.deezer.query_limit.max(1),
            record_type: config.queue.record_type,
            release_from: config.queue.release_from,
            release_to: config.queue.release_to,
            expand_playlists: config.queue.expand_playlists,
            skip_owned: config.collection.skip_owned,
            thresholds: MatchThresholds {
                album: config.collection.album_threshold,
                artist: config.collection.artist_threshold,
            },
            max_workers: config.batch.max_workers.max(1),
            extractor: ExtractorSettings::from_config(config),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Per-call knobs threaded through one resolution.
#[derive(Debug, Clone, Copy)]
struct Pass {
    artist_limit: u32,
    skip_owned: bool,
}

pub struct ResolutionService {
    registry: LinkRegistry,
    resolver: Arc<CrossPlatformResolver>,
    extractor: PlaylistExtractor,
    collection: Option<Arc<CollectionIndex>>,
    queue: ResolutionQueue,
    settings: ServiceSettings,
}

impl ResolutionService {
    pub fn new(resolver: Arc<CrossPlatformResolver>, settings: ServiceSettings) -> Self {
        Self {
            registry: LinkRegistry::default(),
            extractor: PlaylistExtractor::new(resolver.clone(), settings.extractor.clone()),
            resolver,
            collection: None,
            queue: ResolutionQueue::new(),
            settings,
        }
    }

    /// Wire the real platform clients from configuration.
    ///
    /// Spotify is only enabled when both credentials are set; the collection
    /// is scanned when `collection.root` is configured.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mut catalog = CatalogClient::builder()
            .timeout(Duration::from_secs(config.deezer.timeout_secs))
            .rate_limit_interval(Duration::from_millis(config.deezer.min_request_interval_ms));
        if let Some(base_url) = &config.deezer.base_url {
            catalog = catalog.base_url(base_url);
        }
        let catalog: Arc<dyn CatalogApi> = Arc::new(catalog.build().context("building catalog client")?);

        let secondary: Option<Arc<dyn SecondaryPlatform>> = match config.spotify.credentials() {
            Some((client_id, client_secret)) => {
                let mut builder = SpotifyClient::builder(client_id, client_secret)
                    .timeout(Duration::from_secs(config.spotify.timeout_secs));
                if let Some(api_base) = &config.spotify.api_base_url {
                    builder = builder.api_base(api_base);
                }
                if let Some(token_url) = &config.spotify.token_url {
                    builder = builder.token_url(token_url);
                }
                let client: Arc<dyn SecondaryPlatform> =
                    Arc::new(builder.build().context("building spotify client")?);
                Some(client)
            }
            None => None,
        };

        let video: Arc<dyn VideoMetadataSource> = Arc::new(YtDlpClient::new(
            &config.youtube.ytdlp_path,
            Duration::from_secs(config.youtube.timeout_secs),
        ));

        let settings = ServiceSettings::from_config(config);
        let resolver = Arc::new(CrossPlatformResolver::new(catalog, secondary, Some(video)));
        let mut service = Self::new(resolver, settings);

        if let Some(root) = &config.collection.root {
            let index = CollectionIndex::build_with_thresholds(root, service.settings.thresholds);
            service = service.with_collection(index);
        }

        Ok(service)
    }

    /// Attach a collection index used by `is_owned` checks and skip-owned admission.
    pub fn with_collection(mut self, index: CollectionIndex) -> Self {
        let stats = index.stats();
        info!(
            target: "service",
            root = %index.root().display(),
            artists = stats.artists,
            albums = stats.albums,
            "collection attached"
        );
        self.collection = Some(Arc::new(index));
        self
    }

    pub fn queue(&self) -> &ResolutionQueue {
        &self.queue
    }

    pub fn collection(&self) -> Option<&CollectionIndex> {
        self.collection.as_deref()
    }

    pub fn resolver(&self) -> &Arc<CrossPlatformResolver> {
        &self.resolver
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Resolve a query, catalog ID or link and queue the result.
    pub async fn resolve_one(&self, input: &str) -> ResolutionOutcome {
        let pass = Pass {
            artist_limit: self.settings.query_limit,
            skip_owned: self.settings.skip_owned,
        };
        self.run(input, pass).await
    }

    /// Resolve "artist - album" lines concurrently, at most `max_workers` at a
    /// time. Outcomes are returned in input order.
    pub async fn resolve_batch<I, S>(&self, lines: I) -> Vec<ResolutionOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pass = Pass {
            artist_limit: 1,
            skip_owned: self.settings.skip_owned,
        };
        let lines: Vec<String> = lines.into_iter().map(|l| l.as_ref().trim().to_string()).collect();
        info!(target: "service", lines = lines.len(), workers = self.settings.max_workers, "resolving batch");

        let outcomes: Vec<ResolutionOutcome> = stream::iter(lines)
            .map(|line| async move {
                if !line.contains(" - ") {
                    let error = ResolutionError::invalid_input(format!("expected \"artist - album\", got {line:?}"));
                    warn!(target: "service", input = %line, %error, "skipping batch line");
                    return ResolutionOutcome::failed(&line, error);
                }
                self.run(&line, pass).await
            })
            .buffered(self.settings.max_workers.max(1))
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(target: "service", total = outcomes.len(), failed, queued = self.queue.len(), "batch finished");
        outcomes
    }

    /// Album IDs of a playlist link, without queueing anything.
    pub async fn extract_playlist(&self, url: &str) -> ResolutionResult<PlaylistExtraction> {
        let reference = self.playlist_reference(url)?;
        self.extractor.extract_albums(&reference).await
    }

    /// Extract a playlist and queue its albums, optionally skipping owned ones.
    pub async fn queue_playlist(&self, url: &str, skip_owned: bool) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::new(url);
        let pass = Pass {
            artist_limit: self.settings.query_limit,
            skip_owned,
        };
        let result = match self.playlist_reference(url) {
            Ok(reference) => self.expand_playlist(&reference, pass, &mut outcome).await,
            Err(e) => Err(e),
        };
        if let Err(error) = result {
            warn!(target: "service", input = %url, %error, "playlist failed");
            outcome.error = Some(error);
        }
        outcome
    }

    /// Whether the attached collection has the album. False without a collection.
    pub fn is_owned(&self, artist: &str, album: &str) -> bool {
        self.collection
            .as_ref()
            .map(|index| index.is_owned(artist, album))
            .unwrap_or(false)
    }

    fn playlist_reference(&self, url: &str) -> ResolutionResult<ForeignReference> {
        let reference = self.registry.parse(url)?;
        if reference.kind != ReleaseKind::Playlist {
            return Err(ResolutionError::invalid_input(format!("{url} is a {} link, not a playlist", reference.kind)));
        }
        Ok(reference)
    }

    async fn run(&self, input: &str, pass: Pass) -> ResolutionOutcome {
        let mut outcome = ResolutionOutcome::new(input);
        if let Err(error) = self.process(input, pass, &mut outcome).await {
            warn!(target: "service", input, %error, "resolution failed");
            outcome.error = Some(error);
        }
        outcome
    }

    async fn process(&self, input: &str, pass: Pass, outcome: &mut ResolutionOutcome) -> ResolutionResult<()> {
        match ResolveInput::parse(input)? {
            ResolveInput::Link(link) => {
                let reference = self.registry.parse(&link)?;
                self.process_reference(&reference, pass, outcome).await
            }
            ResolveInput::Catalog { kind, id } => {
                let reference = ForeignReference {
                    platform: Platform::Deezer,
                    kind,
                    opaque_id: id.to_string(),
                    raw_url: format!("https://www.deezer.com/{kind}/{id}"),
                };
                self.process_reference(&reference, pass, outcome).await
            }
            ResolveInput::ArtistAlbum { artist, album } => {
                let release = self.find_album(&artist, &album, pass.artist_limit).await?;
                self.admit(release, pass, outcome);
                Ok(())
            }
            ResolveInput::Artist(name) => {
                let catalog = self.resolver.catalog();
                let hits = catalog
                    .search_artists(SearchQuery::new(&name).limit(1))
                    .await
                    .map_err(|e| ResolutionError::from_catalog(&e, &format!("artist search {name:?}")))?;
                let artist = hits
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolutionError::not_found(format!("no artist matching {name:?}")))?;
                self.expand_discography(CatalogId(artist.id), &artist.name, pass, outcome).await
            }
        }
    }

    async fn process_reference(
        &self,
        reference: &ForeignReference,
        pass: Pass,
        outcome: &mut ResolutionOutcome,
    ) -> ResolutionResult<()> {
        let expandable = matches!(reference.platform, Platform::Deezer | Platform::Spotify);
        if reference.kind == ReleaseKind::Playlist && expandable && self.settings.expand_playlists {
            return self.expand_playlist(reference, pass, outcome).await;
        }

        let release = self.resolver.resolve(reference).await?;
        match release.kind {
            ReleaseKind::Artist => {
                self.expand_discography(release.catalog_id, &release.artist_name, pass, outcome)
                    .await
            }
            _ => {
                self.admit(release, pass, outcome);
                Ok(())
            }
        }
    }

    async fn expand_playlist(
        &self,
        reference: &ForeignReference,
        pass: Pass,
        outcome: &mut ResolutionOutcome,
    ) -> ResolutionResult<()> {
        let extraction = self.extractor.extract_albums(reference).await?;

        outcome.partial_failures.extend(
            extraction
                .skipped
                .iter()
                .map(|s| ResolutionError::not_found(format!("{}: {}", s.track, s.reason))),
        );
        if let Some(aborted) = extraction.aborted {
            outcome.partial_failures.push(aborted);
        }

        for id in extraction.album_ids {
            match self.resolver.resolve_catalog(ReleaseKind::Album, id).await {
                Ok(release) => self.admit(release, pass, outcome),
                Err(error) => {
                    warn!(target: "service", catalog_id = %id, %error, "playlist album failed");
                    outcome.partial_failures.push(error);
                }
            }
        }
        Ok(())
    }

    /// Queue an artist's releases that pass the record type and date filters.
    async fn expand_discography(
        &self,
        artist_id: CatalogId,
        artist_name: &str,
        pass: Pass,
        outcome: &mut ResolutionOutcome,
    ) -> ResolutionResult<()> {
        let albums = self
            .resolver
            .catalog()
            .artist_albums(artist_id.0)
            .await
            .map_err(|e| ResolutionError::from_catalog(&e, &format!("discography of {artist_name}")))?;

        let total = albums.len();
        let mut accepted = 0;
        for album in &albums {
            let release = match album_release(album, Some(artist_name)) {
                Ok(release) => release,
                Err(error) => {
                    debug!(target: "service", catalog_id = album.id, %error, "discography entry rejected");
                    outcome.partial_failures.push(error);
                    continue;
                }
            };
            if !self.settings.record_type.matches(release.record_type)
                || !release.released_between(self.settings.release_from, self.settings.release_to)
            {
                debug!(target: "service", %release, "filtered out of discography");
                continue;
            }
            accepted += 1;
            self.admit(release, pass, outcome);
        }

        info!(target: "service", artist = artist_name, total, accepted, "discography expanded");
        Ok(())
    }

    /// Pick the album of an "artist - album" query among the artist candidates' discographies.
    async fn find_album(&self, artist: &str, album: &str, artist_limit: u32) -> ResolutionResult<CanonicalRelease> {
        let catalog = self.resolver.catalog();
        let candidates = catalog
            .search_artists(SearchQuery::new(artist).limit(artist_limit.max(1)))
            .await
            .map_err(|e| ResolutionError::from_catalog(&e, &format!("artist search {artist:?}")))?;
        if candidates.is_empty() {
            return Err(ResolutionError::not_found(format!("no artist matching {artist:?}")));
        }

        let wanted = album.to_lowercase();
        let wanted_normalized = normalize(album);
        let mut transient = None;

        for candidate in &candidates {
            let albums = match catalog.artist_albums(candidate.id).await {
                Ok(albums) => albums,
                Err(e) => {
                    debug!(target: "service", artist_id = candidate.id, error = %e, "discography lookup failed");
                    if e.is_transient() {
                        transient = Some(ResolutionError::from_catalog(&e, &format!("discography of {}", candidate.name)));
                    }
                    continue;
                }
            };

            let by_containment = albums.iter().find(|a| {
                let title = a.title.to_lowercase();
                !title.is_empty() && (title.contains(&wanted) || wanted.contains(&title))
            });
            let matched = by_containment.or_else(|| {
                albums
                    .iter()
                    .find(|a| similar_normalized(&normalize(&a.title), &wanted_normalized, self.settings.thresholds.album))
            });

            if let Some(found) = matched {
                debug!(target: "service", artist = %candidate.name, album = %found.title, "album matched");
                return album_release(found, Some(candidate.name.as_str()));
            }
        }

        Err(transient.unwrap_or_else(|| {
            ResolutionError::not_found(format!("no album matching {album:?} by {artist:?}"))
        }))
    }

    fn admit(&self, release: CanonicalRelease, pass: Pass, outcome: &mut ResolutionOutcome) {
        if pass.skip_owned && release.kind == ReleaseKind::Album && self.is_owned(&release.artist_name, &release.title) {
            info!(target: "service", %release, "already in collection, skipping");
            outcome.owned.push(release);
            return;
        }

        let item = self.settings.defaults.item_for(release);
        if self.queue.push(item.clone()) {
            outcome.queued.push(item);
        } else {
            outcome.duplicates += 1;
        }
    }
}
