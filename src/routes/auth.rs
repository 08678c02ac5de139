//! Registration, login, and the current-user endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::ApiError;
use crate::models::User;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    req.validate()?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)")
            .bind(&req.email)
            .bind(&req.username)
            .fetch_one(&state.db)
            .await?;
    if exists {
        return Err(ApiError::Validation(
            "User with this email or username already exists".into(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, email, password_hash, role, first_name, last_name)
         VALUES ($1, $2, $3, $4, 'user', $5, $6)
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db)
    .await
    .map_err(map_registration_error)?;

    let token = state.jwt.issue(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            token,
            user,
        }),
    ))
}

/// The pre-insert `EXISTS` check races with concurrent registrations; the
/// users UNIQUE constraints are the real guard, so a violation on insert is
/// reported the same way the check would have.
fn map_registration_error(e: sqlx::Error) -> ApiError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiError::Validation(
            "User with this email or username already exists".into(),
        ),
        other => other.into(),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    // The username field also accepts an email address.
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 OR email = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.jwt.issue(&user)?;
    tracing::info!(username = %user.username, "login");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user,
    }))
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct StubDbError(ErrorKind);

    impl fmt::Display for StubDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stub database error")
        }
    }

    impl StdError for StubDbError {}

    impl DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "stub database error"
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn test_duplicate_registration_race_maps_to_validation() {
        // A concurrent duplicate slips past the EXISTS check and trips the
        // UNIQUE constraint on insert; the caller still gets the 400.
        let err = map_registration_error(sqlx::Error::Database(Box::new(StubDbError(
            ErrorKind::UniqueViolation,
        ))));
        match err {
            ApiError::Validation(msg) => {
                assert_eq!(msg, "User with this email or username already exists");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_other_insert_errors_stay_database_errors() {
        let err = map_registration_error(sqlx::Error::Database(Box::new(StubDbError(
            ErrorKind::Other,
        ))));
        assert!(matches!(err, ApiError::Database(_)));

        let err = map_registration_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::Database(_)));
    }
}
