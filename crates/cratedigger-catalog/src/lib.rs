// SPDX-License-Identifier: GPL-3.0-or-later

//! Deezer API client for the primary catalog.
//!
//! This crate provides entity lookups (artist, album, track, playlist),
//! structured searches, UPC lookups and offset-paginated listings, with
//! built-in rate limiting to stay under the public API quota.

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::CatalogClient;
pub use error::{CatalogError, Result};
pub use models::{
    Album, AlbumRef, Artist, ArtistRef, Page, Playlist, PlaylistCreator, SearchQuery, Track,
};
