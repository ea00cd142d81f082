// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Deezer error code for "no data".
pub const ERROR_CODE_NOT_FOUND: i64 = 800;
/// Deezer error code for "quota exceeded".
pub const ERROR_CODE_QUOTA: i64 = 4;
/// Deezer error code for "service busy".
pub const ERROR_CODE_SERVICE_BUSY: i64 = 700;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response from Deezer API: {0}")]
    InvalidResponse(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Deezer error {code} ({kind}): {message}")]
    Envelope {
        code: i64,
        kind: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Errors worth retrying later: transport problems, throttling, server-side failures
    /// and bodies we could not make sense of.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::RateLimitExceeded
            | Self::InvalidResponse(_)
            | Self::SerializationError(_) => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            Self::Envelope { code, .. } => matches!(*code, ERROR_CODE_QUOTA | ERROR_CODE_SERVICE_BUSY),
            Self::NotFound(_) => false,
        }
    }
}
