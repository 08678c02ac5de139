//! Contact form: forwards the message to the admin, persists nothing.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

async fn submit(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;

    state
        .notifier
        .contact_message(&req.name, &req.email, &req.message)
        .map_err(|e| anyhow::anyhow!("contact notification failed: {e}"))?;

    Ok(Json(serde_json::json!({
        "message": "Thank you for your message! We will get back to you soon."
    })))
}
