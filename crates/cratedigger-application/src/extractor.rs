// SPDX-License-Identifier: GPL-3.0-or-later

//! Reduce a remote playlist to the set of catalog albums its tracks belong to.

use crate::errors::{ResolutionError, ResolutionResult};
use crate::resolver::{AlbumHint, CrossPlatformResolver};
use cratedigger_config::AppConfig;
use cratedigger_domain::{CatalogId, ForeignReference, Platform};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    /// Tracks requested per catalog page.
    pub page_size: u32,
    pub catalog_page_delay: Duration,
    pub secondary_page_delay: Duration,
}

impl ExtractorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.deezer.page_size.clamp(1, 100),
            catalog_page_delay: Duration::from_millis(config.deezer.page_delay_ms),
            secondary_page_delay: Duration::from_millis(config.spotify.page_delay_ms),
        }
    }
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTrack {
    pub track: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistExtraction {
    pub playlist_title: String,
    pub album_ids: BTreeSet<CatalogId>,
    pub skipped: Vec<SkippedTrack>,
    /// Set when pagination stopped early; `album_ids` still holds what was collected.
    pub aborted: Option<ResolutionError>,
}

impl PlaylistExtraction {
    fn skip(&mut self, track: impl Into<String>, reason: impl Into<String>) {
        let skipped = SkippedTrack {
            track: track.into(),
            reason: reason.into(),
        };
        warn!(target: "extractor", track = %skipped.track, reason = %skipped.reason, "skipping track");
        self.skipped.push(skipped);
    }
}

pub struct PlaylistExtractor {
    resolver: Arc<CrossPlatformResolver>,
    settings: ExtractorSettings,
}

impl PlaylistExtractor {
    pub fn new(resolver: Arc<CrossPlatformResolver>, settings: ExtractorSettings) -> Self {
        Self { resolver, settings }
    }

    /// Collect unique catalog album IDs from a playlist.
    ///
    /// Fails only when the playlist itself cannot be fetched. Tracks whose
    /// album cannot be resolved are skipped, and a failing page ends the walk
    /// with the albums gathered so far.
    pub async fn extract_albums(&self, reference: &ForeignReference) -> ResolutionResult<PlaylistExtraction> {
        let extraction = match reference.platform {
            Platform::Deezer => {
                let id = CatalogId::parse_str(&reference.opaque_id).ok_or_else(|| {
                    ResolutionError::invalid_input(format!("not a catalog playlist ID: {}", reference.opaque_id))
                })?;
                self.extract_catalog(id).await?
            }
            Platform::Spotify => self.extract_secondary(&reference.opaque_id).await?,
            Platform::YouTube => {
                return Err(ResolutionError::unsupported(
                    "video playlists resolve through their first entry",
                ))
            }
        };

        info!(
            target: "extractor",
            playlist = %extraction.playlist_title,
            albums = extraction.album_ids.len(),
            skipped = extraction.skipped.len(),
            complete = extraction.aborted.is_none(),
            "playlist extracted"
        );
        Ok(extraction)
    }

    async fn extract_catalog(&self, playlist_id: CatalogId) -> ResolutionResult<PlaylistExtraction> {
        let catalog = self.resolver.catalog();
        let playlist = catalog
            .playlist(playlist_id.0)
            .await
            .map_err(|e| ResolutionError::from_catalog(&e, &format!("playlist {playlist_id}")))?;

        let mut extraction = PlaylistExtraction {
            playlist_title: playlist.title,
            ..Default::default()
        };
        let mut index = 0u32;

        loop {
            let page = match catalog.playlist_tracks(playlist_id.0, index, self.settings.page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(target: "extractor", %playlist_id, index, error = %e, "page fetch failed, keeping partial result");
                    extraction.aborted = Some(ResolutionError::from_catalog(&e, &format!("playlist {playlist_id} @{index}")));
                    break;
                }
            };

            debug!(target: "extractor", %playlist_id, index, tracks = page.data.len(), "fetched page");
            let fetched = page.data.len() as u32;
            for track in page.data {
                match track.album {
                    Some(album) => {
                        extraction.album_ids.insert(CatalogId(album.id));
                    }
                    None => extraction.skip(track.title, "track has no album"),
                }
            }

            if page.next.is_none() || fetched == 0 {
                break;
            }
            index += fetched;
            tokio::time::sleep(self.settings.catalog_page_delay).await;
        }

        Ok(extraction)
    }

    async fn extract_secondary(&self, playlist_id: &str) -> ResolutionResult<PlaylistExtraction> {
        let secondary = self.resolver.secondary()?;
        let context = format!("spotify playlist {playlist_id}");
        let playlist = secondary
            .playlist(playlist_id)
            .await
            .map_err(|e| self.resolver.secondary_failure(&e, &context))?;

        let mut extraction = PlaylistExtraction {
            playlist_title: playlist.name,
            ..Default::default()
        };
        let mut resolved: HashMap<String, Result<CatalogId, String>> = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = match secondary.playlist_tracks(playlist_id, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(target: "extractor", playlist_id, error = %e, "page fetch failed, keeping partial result");
                    extraction.aborted = Some(self.resolver.secondary_failure(&e, &context));
                    break;
                }
            };

            debug!(target: "extractor", playlist_id, tracks = page.items.len(), "fetched page");
            for item in page.items {
                let Some(track) = item.track else {
                    extraction.skip("(unavailable)", "removed or local track");
                    continue;
                };
                let Some(album) = track.album.as_ref() else {
                    extraction.skip(track.name, "track has no album");
                    continue;
                };

                let key = album.id.clone().unwrap_or_else(|| AlbumHint::from(album).to_string());
                if !resolved.contains_key(&key) {
                    let full = match album.id.as_deref() {
                        Some(album_id) => secondary.album(album_id).await.ok(),
                        None => None,
                    };
                    let hint = AlbumHint::from(full.as_ref().unwrap_or(album));
                    let outcome = self
                        .resolver
                        .album_id_for(&hint)
                        .await
                        .map(|(id, strategy)| {
                            debug!(target: "extractor", album = %hint, catalog_id = %id, %strategy, "album resolved");
                            id
                        })
                        .map_err(|e| e.to_string());
                    resolved.insert(key.clone(), outcome);
                }

                match resolved.get(&key) {
                    Some(Ok(id)) => {
                        extraction.album_ids.insert(*id);
                    }
                    Some(Err(reason)) => extraction.skip(track.name.clone(), reason.clone()),
                    None => {}
                }
            }

            match page.next {
                Some(next) => {
                    cursor = Some(next);
                    tokio::time::sleep(self.settings.secondary_page_delay).await;
                }
                None => break,
            }
        }

        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SecondaryPlatform;
    use crate::test_support::*;
    use cratedigger_domain::{ReleaseKind, ResolutionErrorKind};

    fn settings() -> ExtractorSettings {
        ExtractorSettings {
            page_size: 3,
            catalog_page_delay: Duration::ZERO,
            secondary_page_delay: Duration::ZERO,
        }
    }

    fn playlist_ref(platform: Platform, id: &str) -> ForeignReference {
        ForeignReference {
            platform,
            kind: ReleaseKind::Playlist,
            opaque_id: id.to_string(),
            raw_url: format!("https://example.invalid/playlist/{id}"),
        }
    }

    #[tokio::test]
    async fn catalog_playlist_pages_into_unique_albums() {
        let tracks = vec![
            track(1, "A", "one", 100),
            track(2, "A", "two", 100),
            track(3, "B", "three", 200),
            track(4, "C", "four", 300),
            track(5, "C", "five", 300),
            track(6, "D", "six", 400),
            track(7, "E", "seven", 500),
        ];
        let catalog = Arc::new(FakeCatalog::default().with_playlist(908622995, "Road trip", tracks));
        let resolver = Arc::new(CrossPlatformResolver::new(catalog.clone(), None, None));

        let extraction = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Deezer, "908622995"))
            .await
            .unwrap();

        assert_eq!(extraction.playlist_title, "Road trip");
        let ids: Vec<u64> = extraction.album_ids.iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![100, 200, 300, 400, 500]);
        assert!(extraction.aborted.is_none());

        let pages: Vec<String> = catalog
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("playlist tracks"))
            .collect();
        assert_eq!(pages, vec!["playlist tracks 908622995 @0", "playlist tracks 908622995 @3", "playlist tracks 908622995 @6"]);
    }

    #[tokio::test]
    async fn secondary_playlist_tolerates_one_unresolvable_album() {
        let artist = sp_artist("ar", "Various");
        let mut catalog = FakeCatalog::default();
        let mut spotify = FakeSpotify {
            page_size: 4,
            ..FakeSpotify::default()
        };
        let mut tracks = Vec::new();

        for n in 1..=10u64 {
            let upc = format!("00000{n}");
            let sp = sp_album(&format!("sa{n}"), "Various", &format!("Record {n}"), Some(upc.as_str()));
            // Track 4's album has no catalog counterpart.
            if n != 4 {
                let mut album = album(1000 + n, "Various", &format!("Record {n}"));
                album.upc = Some(upc.clone());
                catalog = catalog.with_album(album);
            }
            spotify = spotify.with_album(sp.clone());
            tracks.push(Some(sp_track(&format!("t{n}"), &artist, Some(sp))));
        }
        let spotify = Arc::new(spotify.with_playlist("pl", tracks));
        let resolver = Arc::new(CrossPlatformResolver::new(
            Arc::new(catalog),
            Some(spotify.clone() as Arc<dyn SecondaryPlatform>),
            None,
        ));

        let extraction = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Spotify, "pl"))
            .await
            .unwrap();

        assert_eq!(extraction.album_ids.len(), 9);
        assert!(!extraction.album_ids.contains(&CatalogId(1004)));
        assert_eq!(extraction.skipped.len(), 1);
        assert_eq!(extraction.skipped[0].track, "song t4");
        assert!(extraction.aborted.is_none());
    }

    #[tokio::test]
    async fn repeated_secondary_album_is_resolved_once() {
        let artist = sp_artist("ar", "Daft Punk");
        let disc = sp_album("disc", "Daft Punk", "Discovery", Some("724384960650"));
        let mut catalog_album = album(302127, "Daft Punk", "Discovery");
        catalog_album.upc = Some("724384960650".to_string());

        let spotify = Arc::new(
            FakeSpotify::default()
                .with_album(disc.clone())
                .with_playlist(
                    "pl",
                    vec![
                        Some(sp_track("t1", &artist, Some(disc.clone()))),
                        None,
                        Some(sp_track("t2", &artist, Some(disc))),
                        Some(sp_track("t3", &artist, None)),
                    ],
                ),
        );
        let resolver = Arc::new(CrossPlatformResolver::new(
            Arc::new(FakeCatalog::default().with_album(catalog_album)),
            Some(spotify.clone() as Arc<dyn SecondaryPlatform>),
            None,
        ));

        let extraction = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Spotify, "pl"))
            .await
            .unwrap();

        assert_eq!(extraction.album_ids.into_iter().collect::<Vec<_>>(), vec![CatalogId(302127)]);
        assert_eq!(extraction.skipped.len(), 2);
        let album_fetches = spotify.calls().iter().filter(|c| *c == "album disc").count();
        assert_eq!(album_fetches, 1);
    }

    #[tokio::test]
    async fn failed_catalog_page_keeps_albums_collected_so_far() {
        let tracks = (1..=7u64).map(|n| track(n, "Various", &format!("song {n}"), 100 + n)).collect();
        let mut catalog = FakeCatalog::default().with_playlist(55, "Long mix", tracks);
        catalog.failing_pages_from = Some(3);
        let resolver = Arc::new(CrossPlatformResolver::new(Arc::new(catalog), None, None));

        let extraction = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Deezer, "55"))
            .await
            .unwrap();

        let ids: Vec<u64> = extraction.album_ids.iter().map(|id| id.0).collect();
        assert_eq!(ids, vec![101, 102, 103]);
        let aborted = extraction.aborted.expect("walk stopped at the failing page");
        assert_eq!(aborted.kind, ResolutionErrorKind::TransientNetwork);
    }

    #[tokio::test]
    async fn failed_secondary_page_keeps_albums_collected_so_far() {
        let artist = sp_artist("ar", "Various");
        let mut catalog = FakeCatalog::default();
        let mut spotify = FakeSpotify {
            page_size: 2,
            failing_pages_from: Some(2),
            ..FakeSpotify::default()
        };
        let mut tracks = Vec::new();
        for n in 1..=4u64 {
            let upc = format!("10000{n}");
            let sp = sp_album(&format!("sa{n}"), "Various", &format!("Record {n}"), Some(upc.as_str()));
            let mut album = album(2000 + n, "Various", &format!("Record {n}"));
            album.upc = Some(upc);
            catalog = catalog.with_album(album);
            spotify = spotify.with_album(sp.clone());
            tracks.push(Some(sp_track(&format!("t{n}"), &artist, Some(sp))));
        }
        let spotify = Arc::new(spotify.with_playlist("pl", tracks));
        let resolver = Arc::new(CrossPlatformResolver::new(
            Arc::new(catalog),
            Some(spotify.clone() as Arc<dyn SecondaryPlatform>),
            None,
        ));

        let extraction = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Spotify, "pl"))
            .await
            .unwrap();

        assert_eq!(
            extraction.album_ids.into_iter().collect::<Vec<_>>(),
            vec![CatalogId(2001), CatalogId(2002)]
        );
        let aborted = extraction.aborted.expect("walk stopped at the failing page");
        assert_eq!(aborted.kind, ResolutionErrorKind::TransientNetwork);
        assert!(spotify.calls().contains(&"playlist tracks pl 2".to_string()));
    }

    #[tokio::test]
    async fn missing_playlist_is_an_error() {
        let resolver = Arc::new(CrossPlatformResolver::new(Arc::new(FakeCatalog::default()), None, None));
        let err = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Deezer, "1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::NotFound);
    }

    #[tokio::test]
    async fn secondary_playlist_without_credentials_is_config_missing() {
        let resolver = Arc::new(CrossPlatformResolver::new(Arc::new(FakeCatalog::default()), None, None));
        let err = PlaylistExtractor::new(resolver, settings())
            .extract_albums(&playlist_ref(Platform::Spotify, "pl"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::ConfigMissing);
    }
}
