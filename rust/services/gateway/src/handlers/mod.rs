//! Request handlers

pub mod events;
pub mod health;
pub mod plans;
pub mod projects;
pub mod runs;
pub mod ws;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

/// Standard API error response
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: format!("{entity} with id '{id}' not found"),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: message.into(),
        }
    }

    /// Return when request validation fails
    pub fn validation_error(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();

        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "VALIDATION_ERROR",
            message: messages.join("; "),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<lo_core::Error> for ApiError {
    fn from(e: lo_core::Error) -> Self {
        Self {
            status: StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: e.error_code(),
            message: e.to_string(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => {
                tracing::debug!(error = %e, "Record not found");
                Self::not_found("Record", "unknown")
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    // 23505 = unique_violation
                    Some("23505") => {
                        tracing::warn!(error = %e, "Unique constraint violation");
                        Self::bad_request("Resource already exists")
                    }
                    // 23503 = foreign_key_violation
                    Some("23503") => {
                        tracing::warn!(error = %e, "Foreign key violation");
                        Self::bad_request("Referenced resource does not exist")
                    }
                    _ => {
                        tracing::error!(error = %e, code = ?code, "Database error");
                        Self::internal("Database error")
                    }
                }
            }
            sqlx::Error::PoolTimedOut => {
                tracing::error!(error = %e, "Database pool timeout");
                Self::internal("Database temporarily unavailable")
            }
            _ => {
                tracing::error!(error = %e, "Database error");
                Self::internal("Database error")
            }
        }
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(e: redis::RedisError) -> Self {
        tracing::error!(error = %e, "Redis error");
        Self::internal("Queue error")
    }
}

// =============================================================================
// Validated Extractor
// =============================================================================

/// JSON extractor that validates the payload using the `validator` crate.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "JSON parsing error");
            ApiError::bad_request(format!("Invalid JSON: {e}"))
        })?;

        value.validate().map_err(|e| {
            tracing::debug!(errors = ?e, "Validation error");
            ApiError::validation_error(e)
        })?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_http_responses() {
        let err: ApiError = lo_core::Error::InvalidTransition {
            from: "PENDING".to_string(),
            to: "RUNNING".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_TRANSITION");
        assert_eq!(err.message, "invalid transition PENDING -> RUNNING");

        let err: ApiError = lo_core::Error::Unauthorized {
            message: "bad key".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_not_found_message_names_the_entity() {
        let err = ApiError::not_found("Run", "run_x");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(err.message.contains("Run"));
        assert!(err.message.contains("run_x"));
    }
}
