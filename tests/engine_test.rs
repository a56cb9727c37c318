use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use playroom::chat::{ChatReply, ChatRequest, SendMessage};
use playroom::error::RelayError;
use playroom::game::{GameReply, GameRequest, GameStatus, GameView, PlayReply, PlayRequest};
use playroom::state::AppState;
use playroom::types::UserId;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn fetch_game(username: &str, game: &str) -> GameRequest {
    GameRequest {
        method: Some("fetch".to_string()),
        params: PlayRequest {
            username: Some(username.to_string()),
            game: Some(game.to_string()),
            ..Default::default()
        },
    }
}

fn play(username: &str, cell: &str, session: &str, game: &str) -> GameRequest {
    GameRequest {
        method: Some("play".to_string()),
        params: PlayRequest {
            username: Some(username.to_string()),
            mv: Some(cell.to_string()),
            session: Some(session.to_string()),
            game: Some(game.to_string()),
        },
    }
}

fn send(username: &str, message: &str, session: &str, token: Option<&str>) -> ChatRequest {
    ChatRequest {
        method: Some("message".to_string()),
        params: SendMessage {
            username: Some(username.to_string()),
            message: Some(message.to_string()),
            session: Some(session.to_string()),
            token: token.map(str::to_string),
            timestamp: None,
        },
    }
}

fn expect_view(reply: Result<GameReply, RelayError>) -> GameView {
    match reply {
        Ok(GameReply::View(view)) => view,
        other => panic!("Expected game view, got {:?}", other),
    }
}

fn expect_played(reply: Result<GameReply, RelayError>) -> PlayReply {
    match reply {
        Ok(GameReply::Played(played)) => played,
        other => panic!("Expected play reply, got {:?}", other),
    }
}

/// End-to-end game: join, play, collide, win on a column
#[tokio::test]
async fn test_full_game_flow() {
    let state = AppState::default();
    let now = t0();

    let view = expect_view(state.tic_tac_toe_at(fetch_game("alice", "G1"), now).await);
    assert_eq!(view.status, GameStatus::Waiting);

    let view = expect_view(state.tic_tac_toe_at(fetch_game("bob", "G1"), now).await);
    assert_eq!(view.status, GameStatus::Ready);

    let reply = expect_played(state.tic_tac_toe_at(play("alice", "2-2", "SA", "G1"), now).await);
    assert!(reply.outcome.is_none());

    let result = state
        .tic_tac_toe_at(play("bob", "2-2", "SB", "G1"), now)
        .await;
    assert_eq!(result, Err(RelayError::CellTaken));

    expect_played(state.tic_tac_toe_at(play("bob", "1-1", "SB", "G1"), now).await);
    expect_played(state.tic_tac_toe_at(play("alice", "1-2", "SA", "G1"), now).await);
    expect_played(state.tic_tac_toe_at(play("bob", "3-3", "SB", "G1"), now).await);

    let reply = expect_played(state.tic_tac_toe_at(play("alice", "3-2", "SA", "G1"), now).await);
    let outcome = reply.outcome.expect("column 2 should decide the game");
    assert_eq!(outcome.winner, Some(UserId::new("alice")));
    assert_eq!(outcome.loser, Some(UserId::new("bob")));
    assert!(!outcome.tie);

    // Spectators see the decided board
    let view = expect_view(state.tic_tac_toe_at(fetch_game("carol", "G1"), now).await);
    assert_eq!(view.moves.len(), 6);
    assert_eq!(view.outcome.and_then(|o| o.winner), Some(UserId::new("alice")));
}

/// Ledger invariants hold whatever sequence of moves is thrown at a game
#[tokio::test]
async fn test_ledger_invariants_under_noise() {
    let state = AppState::default();
    let users = ["alice", "bob", "carol"];
    let cells = ["1-1", "2-2", "1-1", "3-3", "1-3", "3-1", "2-2", "1-2", "2-1", "3-2", "2-3"];

    let mut accepted = 0;
    for (i, cell) in cells.iter().enumerate() {
        for user in users {
            let request = play(user, cell, &format!("S-{user}"), "NOISE");
            let now = t0() + TimeDelta::milliseconds((i * 10) as i64);
            if state.tic_tac_toe_at(request, now).await.is_ok() {
                accepted += 1;
            }
        }
    }

    let view = expect_view(state.tic_tac_toe_at(fetch_game("dave", "NOISE"), t0()).await);
    assert_eq!(view.moves.len(), accepted);

    let movers: std::collections::HashSet<_> = view.moves.iter().map(|p| &p.username).collect();
    assert!(movers.len() <= 2);

    for (i, play) in view.moves.iter().enumerate() {
        assert!(view.moves[..i].iter().all(|earlier| earlier.cell != play.cell));
        if i > 0 {
            assert_ne!(view.moves[i - 1].username, play.username);
        }
    }
}

#[tokio::test]
async fn test_session_binding_across_moves() {
    let state = AppState::default();

    state
        .tic_tac_toe_at(play("alice", "1-1", "S1", "G"), t0())
        .await
        .unwrap();
    state
        .tic_tac_toe_at(play("bob", "1-2", "SB", "G"), t0())
        .await
        .unwrap();

    let result = state
        .tic_tac_toe_at(play("alice", "1-3", "S2", "G"), t0())
        .await;
    assert_eq!(result, Err(RelayError::SessionMismatch));

    assert!(state
        .tic_tac_toe_at(play("alice", "1-3", "S1", "G"), t0())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_game_rate_limit() {
    let state = AppState::default();

    for _ in 0..50 {
        state
            .tic_tac_toe_at(fetch_game("alice", "G"), t0())
            .await
            .unwrap();
    }
    let result = state
        .tic_tac_toe_at(fetch_game("alice", "G"), t0() + TimeDelta::seconds(4))
        .await;
    assert_eq!(
        result,
        Err(RelayError::RateLimitExceeded {
            retry_after_secs: 6
        })
    );

    // Chat counts separately
    assert!(state
        .chat_at(send("alice", "still here", "S", None), t0())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_private_chat_flow() {
    let state = AppState::default();
    let private = |token: &str| ChatRequest {
        method: Some("private".to_string()),
        params: SendMessage {
            username: Some("bob".to_string()),
            token: Some(token.to_string()),
            ..Default::default()
        },
    };

    let result = state.chat_at(private("tok123"), t0()).await;
    assert_eq!(result, Err(RelayError::InvalidOrExpiredToken));

    state
        .chat_at(send("alice", "psst", "SA", Some("tok123")), t0())
        .await
        .unwrap();

    match state.chat_at(private("tok123"), t0()).await {
        Ok(ChatReply::Messages(messages)) => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].message, "psst");
        }
        other => panic!("Expected messages, got {:?}", other),
    }

    let result = state
        .chat_at(private("tok123"), t0() + TimeDelta::hours(1))
        .await;
    assert_eq!(result, Err(RelayError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_public_message_is_visible_immediately() {
    let state = AppState::default();
    let sent_at = Utc::now();

    let reply = state
        .chat(send("alice", "hello world", "SA", None))
        .await
        .unwrap();
    assert_eq!(
        reply,
        ChatReply::Sent {
            message: "Message sent successfully"
        }
    );

    let fetch = ChatRequest {
        method: Some("fetch".to_string()),
        params: SendMessage {
            username: Some("bob".to_string()),
            ..Default::default()
        },
    };
    match state.chat(fetch).await {
        Ok(ChatReply::Messages(messages)) => {
            let msg = messages
                .iter()
                .find(|m| m.message == "hello world")
                .expect("sent message should be listed");
            let stamped = DateTime::parse_from_rfc3339(&msg.timestamp)
                .unwrap()
                .with_timezone(&Utc);
            assert!(stamped >= sent_at);
        }
        other => panic!("Expected messages, got {:?}", other),
    }
}
