//! HTTP surface: route table and shared layers.

use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod contact;
pub mod feedback;
pub mod orders;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({ "status": "healthy", "service": "mistiq-commerce" }))
            }),
        )
        .nest("/api/auth", auth::router())
        .nest("/api/products", catalog::router())
        .route("/api/vote/:product_id", post(catalog::vote))
        .nest("/api/feedback", feedback::router())
        .nest("/api/contact", contact::router())
        .nest("/api/orders", orders::router())
        .nest("/api/admin", admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
