// Public API for integration tests and the binary

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod game;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod sweep;
pub mod throttle;
pub mod types;
