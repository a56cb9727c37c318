//! HTTP API endpoints.
//!
//! Thin JSON layer over the chat relay and the game engine. Domain errors
//! are returned as `200 OK` with an `error` body; only rate limiting and
//! unknown routes use other status codes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::chat::ChatRequest;
use crate::error::RelayError;
use crate::game::GameRequest;
use crate::state::AppState;
use crate::throttle::{throttle_middleware, RequestThrottle};

/// API versions served by this build
pub const VERSIONS: &[&str] = &["v3"];
/// Endpoints available under every version
pub const ENDPOINTS: &[&str] = &["chat", "tic_tac_toe"];

const POST_ONLY: &str = "This endpoint only supports POST requests.";

/// JSON error body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    pub documentation: String,
}

/// A domain error paired with the documentation link to show with it
pub struct ApiError {
    error: RelayError,
    documentation: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error.to_string(),
            code: Some(self.error.code()),
            documentation: self.documentation,
        };

        match self.error {
            RelayError::RateLimitExceeded { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(body),
            )
                .into_response(),
            _ => (StatusCode::OK, Json(body)).into_response(),
        }
    }
}

fn reply<T: Serialize>(state: &AppState, result: Result<T, RelayError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(error) => ApiError {
            error,
            documentation: state.documentation_url.clone(),
        }
        .into_response(),
    }
}

/// Plain error body without a domain code
fn error_response(state: &AppState, status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        error: message,
        code: None,
        documentation: state.documentation_url.clone(),
    };
    (status, Json(body)).into_response()
}

/// 404 in the same shape for unknown versions and unknown endpoints
fn not_found(state: &AppState, error: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "message": "Not Found",
            "error": error,
            "documentation_url": state.documentation_url,
            "status": "404",
        })),
    )
        .into_response()
}

fn check_version(state: &AppState, version: &str) -> Result<(), Response> {
    if VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(not_found(
            state,
            format!("Invalid API version ({version})."),
        ))
    }
}

/// GET /
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "versions": VERSIONS,
        "endpoints": ENDPOINTS,
    }))
}

/// POST /{version}/chat
///
/// `method` is one of `message`, `private` or `fetch`.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    if let Err(response) = check_version(&state, &version) {
        return response;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!("Rejected chat body: {}", rejection);
            return error_response(&state, rejection.status(), rejection.body_text());
        }
    };

    let result = state.chat(request).await;
    reply(&state, result)
}

/// POST /{version}/tic_tac_toe
///
/// `method` is one of `play` or `fetch`.
pub async fn tic_tac_toe(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
    body: Result<Json<GameRequest>, JsonRejection>,
) -> Response {
    if let Err(response) = check_version(&state, &version) {
        return response;
    }
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!("Rejected game body: {}", rejection);
            return error_response(&state, rejection.status(), rejection.body_text());
        }
    };

    let result = state.tic_tac_toe(request).await;
    reply(&state, result)
}

/// GET on a POST-only endpoint, answered like any other domain error
pub async fn post_only(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> Response {
    if let Err(response) = check_version(&state, &version) {
        return response;
    }
    error_response(&state, StatusCode::OK, POST_ONLY.to_string())
}

/// Unknown route: report a bad version before a bad endpoint
pub async fn fallback(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let mut segments = uri.path().trim_start_matches('/').split('/');
    let version = segments.next().unwrap_or_default();
    let endpoint = segments.next().unwrap_or_default();

    if let Err(response) = check_version(&state, version) {
        return response;
    }
    not_found(
        &state,
        format!("Endpoint '{endpoint}' does not exists in {version}."),
    )
}

/// Build the application router. `throttle = None` disables the global throttle.
pub fn router(state: Arc<AppState>, throttle: Option<RequestThrottle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/", get(index))
        .route("/{version}/chat", get(post_only).post(chat))
        .route("/{version}/tic_tac_toe", get(post_only).post(tic_tac_toe))
        .fallback(fallback)
        .with_state(state);

    if let Some(throttle) = throttle {
        app = app.layer(middleware::from_fn_with_state(
            Arc::new(throttle),
            throttle_middleware,
        ));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}
