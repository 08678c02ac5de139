//! Customer feedback: public listing and submission.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::Feedback;
use crate::AppState;

/// Listings hide low ratings unless the caller asks otherwise.
const DEFAULT_MIN_STARS: i32 = 3;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback).post(submit_feedback))
        .route("/:id", get(get_feedback))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    pub min_stars: Option<i32>,
}

async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let min_stars = query.min_stars.unwrap_or(DEFAULT_MIN_STARS);
    let feedbacks = sqlx::query_as::<_, Feedback>(
        "SELECT * FROM feedbacks WHERE is_visible = TRUE AND stars >= $1 ORDER BY created_at DESC",
    )
    .bind(min_stars)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(feedbacks))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitFeedbackRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(range(min = 1, max = 5, message = "Stars must be between 1 and 5"))]
    pub stars: i32,
    #[validate(length(min = 1, message = "Comments are required"))]
    pub comments: String,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitFeedbackResponse {
    pub message: String,
    pub feedback: Feedback,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<SubmitFeedbackResponse>), ApiError> {
    req.validate()?;

    let feedback = sqlx::query_as::<_, Feedback>(
        "INSERT INTO feedbacks (id, name, email, stars, comments, product)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.name)
    .bind(req.email.to_lowercase())
    .bind(req.stars)
    .bind(&req.comments)
    .bind(req.product.as_deref().unwrap_or(""))
    .fetch_one(&state.db)
    .await?;

    if let Err(e) = state.notifier.feedback_received(&feedback) {
        warn!(error = %e, "feedback notification failed");
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            message: "Feedback submitted successfully".into(),
            feedback,
        }),
    ))
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Feedback>, ApiError> {
    sqlx::query_as::<_, Feedback>("SELECT * FROM feedbacks WHERE id = $1 AND is_visible = TRUE")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Feedback"))
}
