use thiserror::Error;
use tracing::error;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Rejected admin input for a new key. The code travels back to the
/// dashboard as `?err=<code>`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("connection string is missing or shorter than 8 characters")]
    KeyStringInvalid,

    #[error("unknown key type")]
    KeyTypeInvalid,

    #[error("expiry date is not YYYY-MM-DD")]
    ExpireDateInvalid,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::KeyStringInvalid => "KeyStringInvalid",
            Self::KeyTypeInvalid => "KeyTypeInvalid",
            Self::ExpireDateInvalid => "ExpireDateInvalid",
        }
    }
}

/// Convert AppError to HTTP status codes for web responses
impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // A wrong admin path must be byte-identical to any other unknown URL.
        let body = match self {
            Self::NotFound => "Not found",
            Self::Forbidden => "Forbidden",
            other => {
                error!("Request failed: {}", other);
                "Internal server error"
            }
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = AppError::internal("secret detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_codes() {
        assert_eq!(ValidationError::KeyStringInvalid.code(), "KeyStringInvalid");
        assert_eq!(ValidationError::KeyTypeInvalid.code(), "KeyTypeInvalid");
        assert_eq!(ValidationError::ExpireDateInvalid.code(), "ExpireDateInvalid");
    }
}
