// SPDX-License-Identifier: GPL-3.0-or-later

//! Video metadata through the `yt-dlp` executable.
//!
//! Only the title is needed: it is parsed into artist and track names
//! elsewhere and searched on the catalog. Nothing is downloaded.

use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("yt-dlp is not available at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("yt-dlp timed out after {0:?}")]
    Timeout(Duration),

    #[error("yt-dlp failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Invalid yt-dlp output: {0}")]
    InvalidOutput(String),

    #[error("yt-dlp output has no title")]
    MissingTitle,
}

impl VideoError {
    /// A missing binary is a configuration problem, not a network one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct YtDlpClient {
    program: PathBuf,
    timeout: Duration,
}

impl Default for YtDlpClient {
    fn default() -> Self {
        Self::new("yt-dlp", Duration::from_secs(30))
    }
}

impl YtDlpClient {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Fetch the title of a video. With `first_entry`, the URL is treated as a
    /// playlist and the title of its first entry is returned instead.
    pub async fn title(&self, url: &str, first_entry: bool) -> Result<String, VideoError> {
        let mut command = Command::new(&self.program);
        command
            .args(["--dump-single-json", "--skip-download", "--no-warnings"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if first_entry {
            command.args(["--flat-playlist", "--playlist-items", "1"]);
        }
        command.arg(url);

        debug!(target: "youtube", url, first_entry, "running yt-dlp");

        let child = command.spawn().map_err(|e| VideoError::Unavailable {
            path: self.program.display().to_string(),
            reason: match e.kind() {
                ErrorKind::NotFound => "executable not found".to_string(),
                _ => e.to_string(),
            },
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| VideoError::Timeout(self.timeout))?
            .map_err(|e| VideoError::Failed {
                status: "io error".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(VideoError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| VideoError::InvalidOutput(e.to_string()))?;
        trace!(target: "youtube", "yt-dlp info: {}", info);

        title_from_info(&info).ok_or(VideoError::MissingTitle)
    }
}

/// Pull the title out of a yt-dlp info document. Playlist documents carry
/// their videos in `entries`; the first entry with a title wins.
pub fn title_from_info(info: &Value) -> Option<String> {
    let non_blank = |v: &Value| {
        v.get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };

    if let Some(entries) = info.get("entries").and_then(Value::as_array) {
        return entries.iter().find_map(non_blank);
    }
    non_blank(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_of_single_video() {
        let info = json!({"id": "dQw4w9WgXcQ", "title": "Rick Astley - Never Gonna Give You Up (Official Video)"});
        assert_eq!(
            title_from_info(&info).as_deref(),
            Some("Rick Astley - Never Gonna Give You Up (Official Video)")
        );
    }

    #[test]
    fn title_of_playlist_is_first_entry() {
        let info = json!({
            "title": "My Mix",
            "entries": [
                {"id": "a", "title": "  "},
                {"id": "b", "title": "Daft Punk - One More Time"},
                {"id": "c", "title": "Justice - D.A.N.C.E."}
            ]
        });
        assert_eq!(title_from_info(&info).as_deref(), Some("Daft Punk - One More Time"));
    }

    #[test]
    fn empty_playlist_has_no_title() {
        let info = json!({"title": "Empty", "entries": []});
        assert!(title_from_info(&info).is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let client = YtDlpClient::new("/nonexistent/yt-dlp-cratedigger", Duration::from_secs(1));
        let err = client
            .title("https://www.youtube.com/watch?v=dQw4w9WgXcQ", false)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert!(!err.is_transient());
    }
}
