//! Public catalog: visible products, hero section, announcement banner,
//! and product voting.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{AnnouncementBanner, Gender, HeroSection, Product};
use crate::AppState;

pub fn router() -> Router<AppState> {
    // /hero and /announcement must register before /:id.
    Router::new()
        .route("/", get(list_products))
        .route("/hero", get(get_hero))
        .route("/announcement", get(get_announcement))
        .route("/gender/:gender", get(list_by_gender))
        .route("/:id", get(get_product))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_visible = TRUE ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(products))
}

async fn list_by_gender(
    State(state): State<AppState>,
    Path(gender): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let gender = Gender::from_str(&gender).map_err(ApiError::Validation)?;
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE gender = $1 AND is_visible = TRUE ORDER BY created_at DESC",
    )
    .bind(gender.as_str())
    .fetch_all(&state.db)
    .await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_visible = TRUE")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Product"))
}

/// The storefront hero. When no row is active a built-in default is
/// returned without persisting anything.
async fn get_hero(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let hero = sqlx::query_as::<_, HeroSection>(
        "SELECT * FROM hero_sections WHERE is_active = TRUE ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await?;

    let body = match hero {
        Some(hero) => serde_json::to_value(hero).map_err(anyhow::Error::from)?,
        None => default_hero(),
    };
    Ok(Json(body))
}

pub(crate) fn default_hero() -> serde_json::Value {
    serde_json::json!({
        "title": "Discover Scents That Tell Your Story",
        "subtitle": "Let your presence linger beautifully. Explore our handcrafted fragrances designed to match every personality.",
        "backgroundImage": "",
        "backgroundVideo": "/videos/perfume-hero.mp4",
        "primaryButtonText": "Shop Now",
        "secondaryButtonText": "Vote Your Favorite",
        "isActive": true,
    })
}

async fn get_announcement(
    State(state): State<AppState>,
) -> Result<Json<AnnouncementBanner>, ApiError> {
    let banner = sqlx::query_as::<_, AnnouncementBanner>(
        "INSERT INTO announcement_banners (id) VALUES (TRUE)
         ON CONFLICT (id) DO UPDATE SET id = announcement_banners.id
         RETURNING *",
    )
    .fetch_one(&state.db)
    .await?;
    Ok(Json(banner))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let votes: Option<i64> =
        sqlx::query_scalar("UPDATE products SET votes = votes + 1 WHERE id = $1 RETURNING votes")
            .bind(product_id)
            .fetch_optional(&state.db)
            .await?;
    let votes = votes.ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "votes": votes,
        "message": "Vote recorded successfully",
    })))
}
