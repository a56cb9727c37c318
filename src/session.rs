//! Session registry: binds each user identifier to one session token
//!
//! Advisory only. It keeps two clients that picked the same display name
//! from interleaving actions; it does not authenticate anyone.

use chrono::TimeDelta;
use std::collections::HashMap;

use crate::error::{RelayError, RelayResult};
use crate::types::{SessionToken, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub bound_token: SessionToken,
    pub last_activity_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: HashMap<UserId, SessionRecord>,
    idle_timeout: TimeDelta,
}

impl SessionRegistry {
    pub fn new(idle_timeout: TimeDelta) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    fn is_idle(&self, record: &SessionRecord, now: Timestamp) -> bool {
        now - record.last_activity_at >= self.idle_timeout
    }

    /// Bind `user` to `token` on first contact, otherwise require the same token.
    ///
    /// A record idle for at least the timeout counts as absent, so the user
    /// may rebind with a fresh token.
    pub fn bind_or_validate(
        &mut self,
        user: &UserId,
        token: &str,
        now: Timestamp,
    ) -> RelayResult<()> {
        let idle = self
            .sessions
            .get(user)
            .is_some_and(|record| self.is_idle(record, now));
        if idle {
            tracing::debug!(user = %user, "Session expired, rebinding");
            self.sessions.remove(user);
        }

        match self.sessions.get_mut(user) {
            Some(record) if record.bound_token != token => {
                tracing::debug!(user = %user, "Session ID mismatch");
                Err(RelayError::SessionMismatch)
            }
            Some(record) => {
                record.last_activity_at = now;
                Ok(())
            }
            None => {
                self.sessions.insert(
                    user.clone(),
                    SessionRecord {
                        bound_token: token.to_string(),
                        last_activity_at: now,
                    },
                );
                Ok(())
            }
        }
    }

    #[cfg(test)]
    /// Live session for `user`, if any
    pub fn get(&self, user: &UserId, now: Timestamp) -> Option<&SessionRecord> {
        self.sessions
            .get(user)
            .filter(|record| !self.is_idle(record, now))
    }

    /// Remove every session idle for at least the timeout
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let before = self.sessions.len();
        let idle_timeout = self.idle_timeout;
        self.sessions
            .retain(|_, record| now - record.last_activity_at < idle_timeout);
        before - self.sessions.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(crate::config::DEFAULT_SESSION_IDLE_SECS))
    }
}
