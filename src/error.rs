//! API error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`. Validation failures map to
//! 400 with a `{ "message": ... }` body and never leave a partial commit
//! behind; post-commit failures (notification) are absorbed at the call
//! site and never reach this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Insufficient stock for {name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Order number space exhausted after {0} attempts")]
    OrderNumberExhausted(u32),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Access denied. Admin only.")]
    AdminOnly,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ProductNotFound(_)
            | ApiError::InsufficientStock { .. }
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::MissingToken | ApiError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AdminOnly => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::OrderNumberExhausted(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = ApiError::InsufficientStock {
            name: "Noir Essence".into(),
            available: 2,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Noir Essence. Available: 2, Requested: 10"
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AdminOnly.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Order").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::OrderNumberExhausted(16).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
