//! API key authentication middleware
//!
//! Mutating and read routes under /v1 require the `x-api-key` header to
//! match the single configured key. The comparison is constant-time so the
//! key cannot be guessed one byte at a time.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::AppState;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key_matches(key, &state.settings.api_key) => next.run(request).await,
        Some(_) => {
            warn!("Rejected request with invalid API key");
            unauthorized("invalid api key")
        }
        None => unauthorized("missing x-api-key header"),
    }
}

fn key_matches(provided: &str, configured: &str) -> bool {
    provided.as_bytes().ct_eq(configured.as_bytes()).into()
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": message
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_exact() {
        assert!(key_matches("localops-dev-key", "localops-dev-key"));
    }

    #[test]
    fn test_key_rejects_mismatch() {
        assert!(!key_matches("wrong", "localops-dev-key"));
        assert!(!key_matches("localops-dev-key2", "localops-dev-key"));
        assert!(!key_matches("", "localops-dev-key"));
    }
}
