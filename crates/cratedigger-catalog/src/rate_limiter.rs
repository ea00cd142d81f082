// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Deezer quota: 50 requests per 5 second window.
pub const DEEZER_WINDOW_REQUESTS: usize = 50;
pub const DEEZER_WINDOW: Duration = Duration::from_secs(5);

/// Sliding-window limiter shared by every clone of a client.
///
/// A request waits until it is at least `min_interval` after the previous
/// one and the window holds fewer than `max_requests` timestamps.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    max_requests: usize,
    window: Duration,
    sent: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_window(min_interval, DEEZER_WINDOW_REQUESTS, DEEZER_WINDOW)
    }

    pub fn with_window(min_interval: Duration, max_requests: usize, window: Duration) -> Self {
        Self {
            min_interval,
            max_requests: max_requests.max(1),
            window,
            sent: Arc::new(Mutex::new(VecDeque::with_capacity(max_requests.max(1)))),
        }
    }

    /// Wait for a slot. The lock is held while sleeping so callers are served in order.
    pub async fn acquire(&self) {
        let mut sent = self.sent.lock().await;

        let mut ready_at = Instant::now();
        if let Some(&last) = sent.back() {
            ready_at = ready_at.max(last + self.min_interval);
        }
        if sent.len() >= self.max_requests {
            if let Some(&oldest) = sent.front() {
                ready_at = ready_at.max(oldest + self.window);
            }
        }

        if ready_at > Instant::now() {
            tracing::trace!(target: "catalog", wait = ?(ready_at - Instant::now()), "rate limited");
            sleep_until(ready_at).await;
        }

        let now = Instant::now();
        while sent.front().is_some_and(|&t| now.duration_since(t) >= self.window) {
            sent.pop_front();
        }
        while sent.len() >= self.max_requests {
            sent.pop_front();
        }
        sent.push_back(now);
    }
}
