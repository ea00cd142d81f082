// SPDX-License-Identifier: GPL-3.0-or-later

use cratedigger_catalog::CatalogError;
use cratedigger_domain::ResolutionErrorKind;
use cratedigger_platforms::{SpotifyError, VideoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an input could not be turned into queue items.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ResolutionError {
    pub kind: ResolutionErrorKind,
    pub detail: String,
}

pub type ResolutionResult<T> = Result<T, ResolutionError>;

impl ResolutionError {
    pub fn new(kind: ResolutionErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::NotFound, detail)
    }

    pub fn geo_blocked(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::GeoBlocked, detail)
    }

    pub fn transient(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::TransientNetwork, detail)
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::UnsupportedPlatform, detail)
    }

    pub fn config_missing(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::ConfigMissing, detail)
    }

    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(ResolutionErrorKind::InvalidInput, detail)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ResolutionErrorKind::TransientNetwork
    }

    pub fn from_catalog(err: &CatalogError, context: &str) -> Self {
        let detail = format!("{context}: {err}");
        if err.is_transient() {
            Self::transient(detail)
        } else {
            Self::not_found(detail)
        }
    }

    pub fn from_spotify(err: &SpotifyError, context: &str) -> Self {
        let detail = format!("{context}: {err}");
        match err {
            SpotifyError::Auth(_) => Self::config_missing(detail),
            e if e.is_transient() => Self::transient(detail),
            _ => Self::not_found(detail),
        }
    }

    pub fn from_video(err: &VideoError, context: &str) -> Self {
        let detail = format!("{context}: {err}");
        if err.is_unavailable() {
            Self::config_missing(detail)
        } else if err.is_transient() {
            Self::transient(detail)
        } else {
            Self::not_found(detail)
        }
    }
}
