//! Per-user sliding window rate limiting
//!
//! Each subsystem (chat, game) owns its own `RateLimiter`, so limits are
//! counted in separate namespaces.

use chrono::TimeDelta;
use std::collections::{HashMap, VecDeque};

use crate::config::LimitConfig;
use crate::error::{RelayError, RelayResult};
use crate::types::{expires_after, Timestamp, UserId};

/// Rate limiter state
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    /// Recent request instants per user, oldest first
    requests: HashMap<UserId, VecDeque<Timestamp>>,
    config: LimitConfig,
}

impl RateLimiter {
    /// A window that is not positive would never hold a request, so it
    /// is replaced by the default one
    pub fn new(mut config: LimitConfig) -> Self {
        if config.window <= TimeDelta::zero() {
            tracing::warn!(
                window_ms = config.window.num_milliseconds(),
                "Rate-limit window must be positive, using default"
            );
            config.window = LimitConfig::default().window;
        }
        Self {
            requests: HashMap::new(),
            config,
        }
    }

    /// Record a request from `user` at `now`.
    ///
    /// Timestamps older than the window are dropped first. When the user
    /// already has `max_requests` inside the window the request is rejected
    /// and not recorded.
    pub fn check(&mut self, user: &UserId, now: Timestamp) -> RelayResult<()> {
        let window = self.config.window;
        let history = self.requests.entry(user.clone()).or_default();

        while history.front().is_some_and(|ts| now - *ts >= window) {
            history.pop_front();
        }

        if history.len() >= self.config.max_requests {
            // Window is non-empty here unless max_requests is zero
            let oldest = history.front().copied().unwrap_or(now);
            let remaining_ms = (expires_after(oldest, window) - now).num_milliseconds().max(0);
            let retry_after_secs = (remaining_ms as u64).div_ceil(1000);
            tracing::warn!(user = %user, retry_after_secs, "Rate limited");
            return Err(RelayError::RateLimitExceeded { retry_after_secs });
        }

        history.push_back(now);
        Ok(())
    }

    /// Drop users whose whole history has aged out of the window
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let window = self.config.window;
        let before = self.requests.len();
        self.requests
            .retain(|_, history| history.back().is_some_and(|ts| now - *ts < window));
        before - self.requests.len()
    }

    /// Number of users currently tracked
    #[cfg(test)]
    pub fn tracked_users(&self) -> usize {
        self.requests.len()
    }
}
