// SPDX-License-Identifier: GPL-3.0-or-later

//! Clients for the platforms whose links are translated into catalog releases:
//! the Spotify Web API and YouTube (through the `yt-dlp` executable).

pub mod spotify;
pub mod youtube;

pub use spotify::{SpotifyClient, SpotifyError};
pub use youtube::{VideoError, YtDlpClient};
