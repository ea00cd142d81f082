// SPDX-License-Identifier: GPL-3.0-or-later
pub mod collection;
pub mod download;
pub mod errors;
pub mod extractor;
pub mod links;
pub mod queue;
pub mod resolver;
pub mod service;
pub mod sources;
pub mod text;
pub mod video_title;

#[cfg(test)]
mod test_support;

pub use collection::{CollectionIndex, CollectionStats};
pub use download::{run_queue, DownloadError, DownloadExecutor, DownloadReport, FailedDownload};
pub use errors::{ResolutionError, ResolutionResult};
pub use extractor::{ExtractorSettings, PlaylistExtraction, PlaylistExtractor, SkippedTrack};
pub use links::{LinkHandler, LinkRegistry};
pub use queue::{QueueDefaults, ResolutionQueue};
pub use resolver::{AlbumHint, CrossPlatformResolver, ResolutionStrategy};
pub use service::{ResolutionOutcome, ResolutionService, ResolveInput, ServiceSettings};
pub use sources::{CatalogApi, SecondaryPlatform, VideoMetadataSource};
pub use text::{normalize, similar, MatchThresholds};
