//! Process-wide request throttle
//!
//! Caps the total request rate across all clients with one fixed window,
//! independent of the per-user limits inside chat and game.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::ThrottleConfig;

/// Throttle state
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    /// Request count and window start
    window_state: Arc<Mutex<(u32, Instant)>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(&ThrottleConfig::default())
    }
}

impl RequestThrottle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            window_state: Arc::new(Mutex::new((0, Instant::now()))),
            max_requests: config.max_requests,
            window: config.window,
        }
    }

    /// Count a request. Returns true if allowed, false if throttled
    pub async fn check(&self) -> bool {
        let now = Instant::now();
        let mut state = self.window_state.lock().await;
        let (count, window_start) = &mut *state;

        if now.duration_since(*window_start) >= self.window {
            *count = 1;
            *window_start = now;
            true
        } else if *count >= self.max_requests {
            false
        } else {
            *count += 1;
            true
        }
    }

    /// Seconds until the current window closes, at least 1
    pub async fn retry_after_secs(&self) -> u64 {
        let (_, window_start) = *self.window_state.lock().await;
        let remaining = self.window.saturating_sub(window_start.elapsed());
        remaining.as_secs_f64().ceil().max(1.0) as u64
    }
}

/// Build a 429 response
async fn too_many_requests(throttle: &RequestThrottle) -> Response {
    let retry_after = throttle.retry_after_secs().await.to_string();
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, retry_after)],
        Json(serde_json::json!({ "message": "Too Many Requests" })),
    )
        .into_response()
}

/// Middleware rejecting requests once the global window is full
pub async fn throttle_middleware(
    State(throttle): State<Arc<RequestThrottle>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !throttle.check().await {
        tracing::warn!(uri = %request.uri(), "Request throttled");
        return too_many_requests(&throttle).await;
    }

    next.run(request).await
}
