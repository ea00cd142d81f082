// SPDX-License-Identifier: GPL-3.0-or-later

//! Hand-off from the queue to whatever performs the downloads.

use crate::queue::ResolutionQueue;
use async_trait::async_trait;
use cratedigger_domain::QueueItem;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("login failed: {0}")]
    Login(String),
    #[error("not available in your country: {0}")]
    GeoBlocked(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("download failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    /// Called once before the first download.
    async fn login(&self) -> Result<(), DownloadError> {
        Ok(())
    }

    async fn download(&self, item: &QueueItem) -> Result<(), DownloadError>;
}

#[derive(Debug)]
pub struct FailedDownload {
    pub item: QueueItem,
    pub error: DownloadError,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub completed: Vec<QueueItem>,
    pub failed: Vec<FailedDownload>,
}

impl DownloadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drain `queue` through `executor` in insertion order.
///
/// A failing item is recorded and the run continues. When login fails the
/// queue is left as it was and the error is returned.
pub async fn run_queue(
    queue: &ResolutionQueue,
    executor: &dyn DownloadExecutor,
) -> Result<DownloadReport, DownloadError> {
    executor.login().await?;

    let items = queue.drain();
    info!(target: "download", count = items.len(), "starting downloads");

    let mut report = DownloadReport::default();
    for item in items {
        match executor.download(&item).await {
            Ok(()) => {
                info!(target: "download", release = %item.release, "downloaded");
                report.completed.push(item);
            }
            Err(error) => {
                warn!(target: "download", release = %item.release, %error, "download failed");
                report.failed.push(FailedDownload { item, error });
            }
        }
    }

    info!(
        target: "download",
        completed = report.completed.len(),
        failed = report.failed.len(),
        "downloads finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cratedigger_domain::{Bitrate, CanonicalRelease, CatalogId, RecordType, ReleaseKind};
    use std::sync::Mutex;

    fn release(id: u64) -> CanonicalRelease {
        CanonicalRelease {
            catalog_id: CatalogId(id),
            kind: ReleaseKind::Album,
            artist_name: "Artist".to_string(),
            title: format!("Album {id}"),
            record_type: RecordType::Album,
            release_date: None,
            source_url: String::new(),
        }
    }

    struct RecordingExecutor {
        reject_login: bool,
        blocked: Vec<u64>,
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl DownloadExecutor for RecordingExecutor {
        async fn login(&self) -> Result<(), DownloadError> {
            if self.reject_login {
                return Err(DownloadError::Login("bad arl".to_string()));
            }
            Ok(())
        }

        async fn download(&self, item: &QueueItem) -> Result<(), DownloadError> {
            let id = item.release.catalog_id.0;
            self.seen.lock().unwrap().push(id);
            if self.blocked.contains(&id) {
                return Err(DownloadError::GeoBlocked(item.release.title.clone()));
            }
            Ok(())
        }
    }

    fn queue_of(ids: &[u64]) -> ResolutionQueue {
        let queue = ResolutionQueue::new();
        for id in ids {
            queue.enqueue(release(*id), Bitrate::Mp3_320, "dl");
        }
        queue
    }

    #[tokio::test]
    async fn failures_are_isolated_per_item() {
        let queue = queue_of(&[3, 1, 2]);
        let executor = RecordingExecutor {
            reject_login: false,
            blocked: vec![1],
            seen: Mutex::new(Vec::new()),
        };

        let report = run_queue(&queue, &executor).await.unwrap();

        assert_eq!(*executor.seen.lock().unwrap(), vec![3, 1, 2]);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].error, DownloadError::GeoBlocked(_)));
        assert!(!report.is_clean());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn login_failure_leaves_queue_untouched() {
        let queue = queue_of(&[1, 2]);
        let executor = RecordingExecutor {
            reject_login: true,
            blocked: Vec::new(),
            seen: Mutex::new(Vec::new()),
        };

        let err = run_queue(&queue, &executor).await.unwrap_err();

        assert!(matches!(err, DownloadError::Login(_)));
        assert_eq!(queue.len(), 2);
        assert!(executor.seen.lock().unwrap().is_empty());
    }
}
