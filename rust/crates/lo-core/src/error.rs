//! Error types for LocalOps

/// Result type alias using LocalOps Error
pub type Result<T> = std::result::Result<T, Error>;

/// LocalOps error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ==========================================================================
    // Client errors (4xx)
    // ==========================================================================
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // ==========================================================================
    // Internal errors (5xx)
    // ==========================================================================
    #[error("database error: {0}")]
    Database(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation { .. } => 400,
            Error::Unauthorized { .. } => 401,
            Error::InvalidTransition { .. } => 400,
            Error::Database(_) => 500,
            Error::Queue(_) => 500,
            Error::Internal(_) => 500,
            Error::Config(_) => 500,
        }
    }

    /// Error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::Unauthorized { .. } => "UNAUTHORIZED",
            Error::InvalidTransition { .. } => "INVALID_TRANSITION",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Queue(_) => "QUEUE_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            from: "PENDING".to_string(),
            to: "RUNNING".to_string(),
        };
        assert_eq!(err.to_string(), "invalid transition PENDING -> RUNNING");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_not_found_is_404() {
        let err = Error::NotFound {
            entity: "run",
            id: "run_x".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
