//! Runtime configuration loaded from environment variables

use chrono::TimeDelta;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RATE_LIMIT_MAX: usize = 50;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: i64 = 10_000;
pub const DEFAULT_MESSAGE_RETENTION_SECS: i64 = 3600;
pub const DEFAULT_SESSION_IDLE_SECS: i64 = 3600;
pub const DEFAULT_GAME_IDLE_SECS: i64 = 3600;
pub const DEFAULT_GAME_DECIDED_SECS: i64 = 600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_THROTTLE_MAX: u32 = 1000;
pub const DEFAULT_THROTTLE_WINDOW_SECS: u64 = 10;
pub const DEFAULT_DOCUMENTATION_URL: &str = "https://docs.sylvain.pro";
/// Upper bound for every configured window and lifetime
pub const MAX_DURATION_DAYS: i64 = 3650;

/// Per-user sliding window limits (one limiter per subsystem)
#[derive(Debug, Clone, PartialEq)]
pub struct LimitConfig {
    pub max_requests: usize,
    pub window: TimeDelta,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: TimeDelta::milliseconds(DEFAULT_RATE_LIMIT_WINDOW_MS),
        }
    }
}

/// Lifetimes of every volatile entity
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryConfig {
    pub message_retention: TimeDelta,
    pub session_idle: TimeDelta,
    /// In-progress and empty games, measured from the last activity
    pub game_idle: TimeDelta,
    /// Games that reached a winner or a tie, measured from the final move
    pub game_decided: TimeDelta,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            message_retention: TimeDelta::seconds(DEFAULT_MESSAGE_RETENTION_SECS),
            session_idle: TimeDelta::seconds(DEFAULT_SESSION_IDLE_SECS),
            game_idle: TimeDelta::seconds(DEFAULT_GAME_IDLE_SECS),
            game_decided: TimeDelta::seconds(DEFAULT_GAME_DECIDED_SECS),
        }
    }
}

/// Global fixed-window request throttle (None = disabled)
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_THROTTLE_MAX,
            window: Duration::from_secs(DEFAULT_THROTTLE_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub limits: LimitConfig,
    pub expiry: ExpiryConfig,
    /// Cadence of the background expiry sweep (None = lazy expiry only)
    pub sweep_interval: Option<Duration>,
    pub throttle: Option<ThrottleConfig>,
    pub documentation_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            limits: LimitConfig::default(),
            expiry: ExpiryConfig::default(),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            throttle: Some(ThrottleConfig::default()),
            documentation_url: DEFAULT_DOCUMENTATION_URL.to_string(),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(name, value = %raw, "Ignoring unparseable config value");
            default
        }),
        Err(_) => default,
    }
}

/// Read a positive duration in `unit`s, falling back to `default` when unset,
/// malformed, zero or longer than `MAX_DURATION_DAYS`
fn env_duration(name: &str, default: TimeDelta, unit: fn(i64) -> Option<TimeDelta>) -> TimeDelta {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .and_then(|value| i64::try_from(value).ok())
        .and_then(unit)
        .filter(|delta| {
            *delta > TimeDelta::zero() && *delta <= TimeDelta::days(MAX_DURATION_DAYS)
        })
        .unwrap_or_else(|| {
            tracing::warn!(name, value = %raw, "Ignoring out-of-range duration");
            default
        })
}

impl AppConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let port = env_or("PORT", DEFAULT_PORT);

        let defaults = ExpiryConfig::default();
        let limits = LimitConfig {
            max_requests: env_or("RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
            window: env_duration(
                "RATE_LIMIT_WINDOW_MS",
                LimitConfig::default().window,
                TimeDelta::try_milliseconds,
            ),
        };

        let expiry = ExpiryConfig {
            message_retention: env_duration(
                "MESSAGE_RETENTION_SECS",
                defaults.message_retention,
                TimeDelta::try_seconds,
            ),
            session_idle: env_duration(
                "SESSION_IDLE_SECS",
                defaults.session_idle,
                TimeDelta::try_seconds,
            ),
            game_idle: env_duration("GAME_IDLE_SECS", defaults.game_idle, TimeDelta::try_seconds),
            game_decided: env_duration(
                "GAME_DECIDED_SECS",
                defaults.game_decided,
                TimeDelta::try_seconds,
            ),
        };

        let sweep_secs = env_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
        let sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        let throttle_max = env_or("THROTTLE_MAX", DEFAULT_THROTTLE_MAX);
        let throttle = (throttle_max > 0).then(|| ThrottleConfig {
            max_requests: throttle_max,
            window: Duration::from_secs(env_or(
                "THROTTLE_WINDOW_SECS",
                DEFAULT_THROTTLE_WINDOW_SECS,
            )),
        });

        let documentation_url = std::env::var("DOCUMENTATION_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENTATION_URL.to_string());

        tracing::info!(
            port,
            rate_limit_max = limits.max_requests,
            rate_limit_window_ms = limits.window.num_milliseconds(),
            sweep_enabled = sweep_interval.is_some(),
            throttle_enabled = throttle.is_some(),
            "Config loaded"
        );

        Self {
            port,
            limits,
            expiry,
            sweep_interval,
            throttle,
            documentation_url,
        }
    }
}
