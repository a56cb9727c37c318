//! Chat relay: one public log plus token-addressed private channels
//!
//! Every message lives for a fixed retention period counted from the
//! moment it was stored, whatever timestamp the sender supplied.

use chrono::{SecondsFormat, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{ExpiryConfig, LimitConfig};
use crate::error::{RelayError, RelayResult};
use crate::rate_limit::RateLimiter;
use crate::session::SessionRegistry;
use crate::types::{expires_after, non_empty, PrivateToken, Timestamp, UserId};

pub const MESSAGE_SENT: &str = "Message sent successfully";
const CHAT_ACTIONS: &str = "\"message\", \"private\", or \"fetch\"";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub username: String,
    pub message: String,
    /// ISO-8601, either caller supplied or the exact time of storage
    pub timestamp: String,
    #[serde(skip)]
    expires_at: Timestamp,
}

impl ChatMessage {
    fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Parameters of a send, straight from the request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessage {
    pub username: Option<String>,
    pub message: Option<String>,
    pub session: Option<String>,
    /// Private channel token; `None` posts to the public log
    pub token: Option<PrivateToken>,
    pub timestamp: Option<String>,
}

/// A chat request as dispatched by `ChatRelay::handle`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub method: Option<String>,
    #[serde(flatten)]
    pub params: SendMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Sent { message: &'static str },
    Messages(Vec<ChatMessage>),
}

#[derive(Debug, Clone)]
pub struct ChatRelay {
    limiter: RateLimiter,
    sessions: SessionRegistry,
    public: Vec<ChatMessage>,
    private: HashMap<PrivateToken, Vec<ChatMessage>>,
    retention: TimeDelta,
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new(LimitConfig::default(), &ExpiryConfig::default())
    }
}

impl ChatRelay {
    pub fn new(limits: LimitConfig, expiry: &ExpiryConfig) -> Self {
        Self {
            limiter: RateLimiter::new(limits),
            sessions: SessionRegistry::new(expiry.session_idle),
            public: Vec::new(),
            private: HashMap::new(),
            retention: expiry.message_retention,
        }
    }

    /// Dispatch a request by its `method` verb
    pub fn handle(&mut self, request: ChatRequest, now: Timestamp) -> RelayResult<ChatReply> {
        let method = request.method.unwrap_or_default();
        let params = request.params;

        if method == "message" {
            self.send_message(params, now)?;
            return Ok(ChatReply::Sent {
                message: MESSAGE_SENT,
            });
        }

        // Reads are rate limited per user as well
        let username =
            non_empty(params.username).ok_or(RelayError::MissingParameter("a username"))?;
        self.limiter.check(&UserId::new(&username), now)?;

        match method.as_str() {
            "private" => {
                let token =
                    non_empty(params.token).ok_or(RelayError::MissingParameter("a valid token"))?;
                self.fetch_private(&token, now).map(ChatReply::Messages)
            }
            "fetch" => self.fetch_public(now).map(ChatReply::Messages),
            _ => Err(RelayError::InvalidAction(CHAT_ACTIONS)),
        }
    }

    /// Store a message in the public log or in a private channel
    pub fn send_message(&mut self, params: SendMessage, now: Timestamp) -> RelayResult<()> {
        let username =
            non_empty(params.username).ok_or(RelayError::MissingParameter("a username"))?;
        let message =
            non_empty(params.message).ok_or(RelayError::MissingParameter("a message"))?;
        let session = non_empty(params.session)
            .ok_or(RelayError::MissingParameter("a valid session ID"))?;

        let user = UserId::new(&username);
        self.limiter.check(&user, now)?;
        self.sessions.bind_or_validate(&user, &session, now)?;

        let msg = ChatMessage {
            username,
            message,
            timestamp: non_empty(params.timestamp)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            expires_at: expires_after(now, self.retention),
        };

        match non_empty(params.token) {
            Some(token) => {
                tracing::debug!(user = %user, "Private message stored");
                let channel = self.private.entry(token).or_default();
                // Drop expired entries so a revived channel starts clean
                channel.retain(|m| !m.is_expired(now));
                channel.push(msg);
            }
            None => {
                tracing::debug!(user = %user, "Public message stored");
                self.public.push(msg);
            }
        }

        Ok(())
    }

    /// All live messages of one private channel, oldest first
    pub fn fetch_private(&mut self, token: &str, now: Timestamp) -> RelayResult<Vec<ChatMessage>> {
        let Some(channel) = self.private.get_mut(token) else {
            return Err(RelayError::InvalidOrExpiredToken);
        };
        channel.retain(|m| !m.is_expired(now));
        if channel.is_empty() {
            self.private.remove(token);
            return Err(RelayError::InvalidOrExpiredToken);
        }
        Ok(channel.clone())
    }

    /// All live public messages, oldest first
    pub fn fetch_public(&mut self, now: Timestamp) -> RelayResult<Vec<ChatMessage>> {
        self.public.retain(|m| !m.is_expired(now));
        if self.public.is_empty() {
            return Err(RelayError::NoMessagesStored);
        }
        Ok(self.public.clone())
    }

    /// Purge expired messages, empty channels, idle sessions and stale rate-limit entries.
    /// Returns the number of messages removed.
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let before = self.message_count();

        self.public.retain(|m| !m.is_expired(now));
        self.private.retain(|_, channel| {
            channel.retain(|m| !m.is_expired(now));
            !channel.is_empty()
        });
        self.sessions.cleanup(now);
        self.limiter.cleanup(now);

        before - self.message_count()
    }

    /// Stored messages across the public log and all private channels
    pub fn message_count(&self) -> usize {
        self.public.len() + self.private.values().map(Vec::len).sum::<usize>()
    }

    pub fn channel_count(&self) -> usize {
        self.private.len()
    }
}
