//! Pure replay of a move ledger into a board and an outcome

use serde::Serialize;

use crate::types::{Cell, SessionToken, UserId};

/// Rows, columns, then both diagonals, as row-major indices
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Symbol {
    X,
    O,
}

/// One accepted move in a game's ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    pub username: UserId,
    #[serde(rename = "move")]
    pub cell: Cell,
    #[serde(skip_serializing)]
    pub session: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loser: Option<UserId>,
    pub tie: bool,
}

impl Outcome {
    /// A winner or a tie ends the game
    pub fn is_decided(&self) -> bool {
        self.winner.is_some() || self.tie
    }
}

/// Players in order of first appearance; the first plays X, every later one O
pub fn player_symbols(moves: &[Play]) -> Vec<(&UserId, Symbol)> {
    let mut order: Vec<(&UserId, Symbol)> = Vec::new();
    for play in moves {
        if !order.iter().any(|(user, _)| *user == &play.username) {
            let symbol = if order.is_empty() { Symbol::X } else { Symbol::O };
            order.push((&play.username, symbol));
        }
    }
    order
}

/// Replay `moves` onto an empty 3x3 board, row-major
pub fn replay(moves: &[Play]) -> [Option<Symbol>; 9] {
    let symbols = player_symbols(moves);
    let mut board = [None; 9];
    for play in moves {
        let symbol = symbols
            .iter()
            .find(|(user, _)| *user == &play.username)
            .map(|(_, symbol)| *symbol);
        board[play.cell.index()] = symbol;
    }
    board
}

fn has_line(board: &[Option<Symbol>; 9], symbol: Symbol) -> bool {
    LINES
        .iter()
        .any(|line| line.iter().all(|&i| board[i] == Some(symbol)))
}

/// Evaluate the ledger. Players are checked in first-appearance order and
/// the first one holding a full line wins. A tie needs all nine cells played
/// without a winner. `loser` is only reported for a two-player game.
pub fn check_game(moves: &[Play]) -> Outcome {
    let board = replay(moves);
    let symbols = player_symbols(moves);

    let winner = symbols
        .iter()
        .find(|(_, symbol)| has_line(&board, *symbol))
        .map(|(user, _)| (*user).clone());

    let loser = match (&winner, symbols.as_slice()) {
        (Some(winner), [(a, _), (b, _)]) => {
            let other = if *a == winner { b } else { a };
            Some((*other).clone())
        }
        _ => None,
    };

    let tie = winner.is_none() && moves.len() == 9;

    Outcome { winner, loser, tie }
}
