use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chat::{ChatRelay, ChatReply, ChatRequest};
use crate::config::AppConfig;
use crate::error::RelayResult;
use crate::game::{GameEngine, GameReply, GameRequest};
use crate::types::Timestamp;

/// Shared application state.
///
/// Each subsystem sits behind its own lock, and a request holds that lock
/// for the whole operation, so rate limiting, session checks and the state
/// change happen atomically with respect to other requests.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<Mutex<ChatRelay>>,
    pub games: Arc<Mutex<GameEngine>>,
    pub documentation_url: String,
}

/// What one sweep removed, and what is still live afterwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub messages: usize,
    pub games: usize,
    pub live_messages: usize,
    pub live_channels: usize,
    pub live_games: usize,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            chat: Arc::new(Mutex::new(ChatRelay::new(
                config.limits.clone(),
                &config.expiry,
            ))),
            games: Arc::new(Mutex::new(GameEngine::new(
                config.limits.clone(),
                config.expiry.clone(),
            ))),
            documentation_url: config.documentation_url.clone(),
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> RelayResult<ChatReply> {
        self.chat_at(request, Utc::now()).await
    }

    pub async fn chat_at(&self, request: ChatRequest, now: Timestamp) -> RelayResult<ChatReply> {
        self.chat.lock().await.handle(request, now)
    }

    pub async fn tic_tac_toe(&self, request: GameRequest) -> RelayResult<GameReply> {
        self.tic_tac_toe_at(request, Utc::now()).await
    }

    pub async fn tic_tac_toe_at(
        &self,
        request: GameRequest,
        now: Timestamp,
    ) -> RelayResult<GameReply> {
        self.games.lock().await.handle(request, now)
    }

    /// Purge everything that expired by `now` across all stores
    pub async fn sweep(&self, now: Timestamp) -> SweepReport {
        let mut chat = self.chat.lock().await;
        let messages = chat.cleanup(now);
        let (live_messages, live_channels) = (chat.message_count(), chat.channel_count());
        drop(chat);

        let mut games = self.games.lock().await;
        let removed_games = games.cleanup(now);
        let live_games = games.game_count();

        SweepReport {
            messages,
            games: removed_games,
            live_messages,
            live_channels,
            live_games,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
