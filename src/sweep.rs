//! Background expiry sweep
//!
//! Reads already treat expired entities as absent; the sweep only reclaims
//! memory for entities nobody touches again.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Spawn a background task that purges expired state every `interval`
pub fn spawn_expiry_sweeper(state: Arc<AppState>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let report = state.sweep(Utc::now()).await;
            if report.messages > 0 || report.games > 0 {
                tracing::debug!(
                    messages = report.messages,
                    games = report.games,
                    live_messages = report.live_messages,
                    live_channels = report.live_channels,
                    live_games = report.live_games,
                    "Expired state swept"
                );
            }
        }
    });
}
