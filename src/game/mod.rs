//! Two-player tic-tac-toe with any number of spectators
//!
//! A game is `Empty` until its first accepted move, `InProgress` while moves
//! keep coming, and `Decided` once the ledger yields a winner or a tie. Every
//! game expires: decided games shortly after the final move, others after a
//! longer stretch without moves. An expired ID starts over as a fresh game.

mod board;

pub use board::{check_game, player_symbols, replay, Outcome, Play, Symbol};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{ExpiryConfig, LimitConfig};
use crate::error::{RelayError, RelayResult};
use crate::rate_limit::RateLimiter;
use crate::session::SessionRegistry;
use crate::types::{expires_after, non_empty, Cell, GameId, SessionToken, Timestamp, UserId};

pub const MOVE_SENT: &str = "Move sent successfully";
const GAME_ACTIONS: &str = "\"play\" or \"fetch\"";

/// Character set for generated game IDs
const ID_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_LENGTH: usize = 5;

/// Generate a random game ID (5 uppercase alphanumerics)
fn generate_game_id() -> GameId {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_CHARS[rng.random_range(0..ID_CHARS.len())] as char)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Fewer than two users registered
    Waiting,
    Ready,
}

#[derive(Debug, Clone)]
pub struct Game {
    moves: Vec<Play>,
    /// Everyone who fetched or moved, in arrival order
    players: Vec<UserId>,
    expires_at: Timestamp,
}

impl Game {
    fn new(expires_at: Timestamp) -> Self {
        Self {
            moves: Vec::new(),
            players: Vec::new(),
            expires_at,
        }
    }

    fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    fn register(&mut self, user: &UserId) {
        if !self.players.contains(user) {
            self.players.push(user.clone());
        }
    }

    pub fn moves(&self) -> &[Play] {
        &self.moves
    }

    pub fn players(&self) -> &[UserId] {
        &self.players
    }

    #[cfg(test)]
    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn last_mover(&self) -> Option<&UserId> {
        self.moves.last().map(|play| &play.username)
    }

    /// Registered user expected to move next
    pub fn turn(&self) -> Option<&UserId> {
        let last = self.last_mover();
        self.players
            .iter()
            .find(|user| Some(*user) != last)
            .or_else(|| self.players.first())
    }

    pub fn status(&self) -> GameStatus {
        if self.players.len() >= 2 {
            GameStatus::Ready
        } else {
            GameStatus::Waiting
        }
    }

    /// `None` until the first move; recomputed from the ledger every time
    pub fn outcome(&self) -> Option<Outcome> {
        (!self.moves.is_empty()).then(|| check_game(&self.moves))
    }
}

/// Raw `play` parameters from the request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayRequest {
    pub username: Option<String>,
    #[serde(rename = "move")]
    pub mv: Option<String>,
    pub session: Option<String>,
    pub game: Option<GameId>,
}

/// A play whose parameters are present and well-formed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPlay {
    pub user: UserId,
    pub cell: Cell,
    pub session: SessionToken,
    pub game: GameId,
}

impl PlayRequest {
    /// Presence checks first, then the cell label
    pub fn validate(self) -> RelayResult<ValidPlay> {
        let username =
            non_empty(self.username).ok_or(RelayError::MissingParameter("a username"))?;
        let mv = non_empty(self.mv).ok_or(RelayError::MissingParameter("a valid move"))?;
        let session =
            non_empty(self.session).ok_or(RelayError::MissingParameter("a valid session ID"))?;
        let game = non_empty(self.game).ok_or(RelayError::MissingParameter("a valid game ID"))?;
        let cell = mv.parse()?;

        Ok(ValidPlay {
            user: UserId::new(&username),
            cell,
            session,
            game,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchRequest {
    pub username: Option<String>,
    /// Omit to open a game under a fresh random ID
    pub game: Option<GameId>,
}

/// A game request as dispatched by `GameEngine::handle`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameRequest {
    pub method: Option<String>,
    #[serde(flatten)]
    pub params: PlayRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayReply {
    pub message: String,
    #[serde(flatten)]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameView {
    pub id: GameId,
    pub moves: Vec<Play>,
    pub players: Vec<UserId>,
    pub turn: Option<UserId>,
    pub status: GameStatus,
    #[serde(flatten)]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GameReply {
    Played(PlayReply),
    View(GameView),
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    limiter: RateLimiter,
    sessions: SessionRegistry,
    games: HashMap<GameId, Game>,
    expiry: ExpiryConfig,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new(LimitConfig::default(), ExpiryConfig::default())
    }
}

impl GameEngine {
    pub fn new(limits: LimitConfig, expiry: ExpiryConfig) -> Self {
        Self {
            limiter: RateLimiter::new(limits),
            sessions: SessionRegistry::new(expiry.session_idle),
            games: HashMap::new(),
            expiry,
        }
    }

    /// Dispatch a request by its `method` verb
    pub fn handle(&mut self, request: GameRequest, now: Timestamp) -> RelayResult<GameReply> {
        match request.method.as_deref().unwrap_or_default() {
            "play" => {
                let play = request.params.validate()?;
                self.play(play, now).map(GameReply::Played)
            }
            "fetch" => {
                let fetch = FetchRequest {
                    username: request.params.username,
                    game: request.params.game,
                };
                self.fetch(fetch, now).map(GameReply::View)
            }
            _ => Err(RelayError::InvalidAction(GAME_ACTIONS)),
        }
    }

    /// Live game under `id`, replacing an expired one with a fresh game
    fn live_game_mut(&mut self, id: &str, now: Timestamp) -> &mut Game {
        if self.games.get(id).is_some_and(|game| game.is_expired(now)) {
            tracing::debug!(game = id, "Game expired, starting over");
            self.games.remove(id);
        }
        let idle = self.expiry.game_idle;
        self.games
            .entry(id.to_string())
            .or_insert_with(|| Game::new(expires_after(now, idle)))
    }

    /// Apply one move after rate limiting, session and game-rule checks
    pub fn play(&mut self, play: ValidPlay, now: Timestamp) -> RelayResult<PlayReply> {
        let ValidPlay {
            user,
            cell,
            session,
            game: game_id,
        } = play;

        self.limiter.check(&user, now)?;
        self.sessions.bind_or_validate(&user, &session, now)?;

        let ExpiryConfig {
            game_idle,
            game_decided,
            ..
        } = self.expiry;
        let game = self.live_game_mut(&game_id, now);

        let movers = player_symbols(&game.moves);
        if movers.len() >= 2 && !movers.iter().any(|(mover, _)| *mover == &user) {
            return Err(RelayError::GameFull);
        }
        if game.last_mover() == Some(&user) {
            return Err(RelayError::NotYourTurn);
        }
        if game.moves.iter().any(|p| p.cell == cell) {
            return Err(RelayError::CellTaken);
        }
        if game.outcome().is_some_and(|outcome| outcome.is_decided()) {
            return Err(RelayError::GameFinished);
        }

        game.moves.push(Play {
            username: user.clone(),
            cell,
            session,
        });
        game.register(&user);

        let outcome = check_game(&game.moves);
        if !outcome.is_decided() {
            game.expires_at = expires_after(now, game_idle);
            tracing::debug!(game = %game_id, user = %user, %cell, "Move accepted");
            return Ok(PlayReply {
                message: MOVE_SENT.to_string(),
                outcome: None,
            });
        }

        game.expires_at = expires_after(now, game_decided);
        let message = match (&outcome.winner, &outcome.loser) {
            (Some(winner), Some(loser)) => {
                format!("{MOVE_SENT}. {winner} wins. {loser} loses.")
            }
            (Some(winner), None) => format!("{MOVE_SENT}. {winner} wins."),
            _ => format!("{MOVE_SENT}. It's a tie."),
        };
        tracing::info!(
            game = %game_id,
            winner = ?outcome.winner,
            tie = outcome.tie,
            "Game decided"
        );

        Ok(PlayReply {
            message,
            outcome: Some(outcome),
        })
    }

    /// View a game, joining it as a viewer; creates the game when missing
    pub fn fetch(&mut self, request: FetchRequest, now: Timestamp) -> RelayResult<GameView> {
        let username =
            non_empty(request.username).ok_or(RelayError::MissingParameter("a username"))?;
        let user = UserId::new(&username);
        self.limiter.check(&user, now)?;

        let id = match non_empty(request.game) {
            Some(id) => id,
            None => self.unused_game_id(now),
        };

        let game = self.live_game_mut(&id, now);
        game.register(&user);

        Ok(GameView {
            id,
            moves: game.moves.clone(),
            players: game.players.clone(),
            turn: game.turn().cloned(),
            status: game.status(),
            outcome: game.outcome(),
        })
    }

    /// Generate an ID that no live game uses
    fn unused_game_id(&self, now: Timestamp) -> GameId {
        loop {
            let id = generate_game_id();
            if self.get(&id, now).is_none() {
                break id;
            }
            // Collision - try again (rare with 60M combinations)
        }
    }

    /// Live game under `id`, if any
    pub fn get(&self, id: &str, now: Timestamp) -> Option<&Game> {
        self.games.get(id).filter(|game| !game.is_expired(now))
    }

    /// Drop expired games, idle sessions and stale rate-limit entries.
    /// Returns the number of games removed.
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let before = self.games.len();
        self.games.retain(|_, game| !game.is_expired(now));
        self.sessions.cleanup(now);
        self.limiter.cleanup(now);
        before - self.games.len()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}
