//! Admin back-office: inventory, orders, analytics, content, settings.
//!
//! Every handler takes the `AdminUser` extractor except the two public
//! routes that live here for path locality: the delivery slip (printed
//! from a link, no auth header available) and the public delivery-charge
//! read used by the storefront.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::analytics::{self, day_end, day_start, DateRange};
use crate::auth::AdminUser;
use crate::checkout::OrderWithItems;
use crate::error::ApiError;
use crate::export;
use crate::models::{AnnouncementBanner, Gender, HeroSection, Order, OrderStatus, Product, Settings};
use crate::routes::orders::{items_for_orders, with_items};
use crate::settings;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Public: printable slip and the storefront's delivery-charge read.
        .route("/orders/:id/delivery-slip", get(delivery_slip))
        .route("/settings", get(get_settings_public))
        // Admin-only from here on (enforced per handler via AdminUser).
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/orders", get(list_orders))
        .route("/orders/export", get(export_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
        .route("/analytics", get(get_analytics))
        .route("/hero", get(get_hero).put(update_hero))
        .route("/announcement", put(update_announcement))
        .route("/settings/full", get(get_settings_full))
        .route("/settings/delivery-charge", put(update_delivery_charge))
}

// ========== PRODUCT MANAGEMENT ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub gender: String,
    #[serde(default)]
    pub impression_of: String,
    #[serde(default)]
    pub top_notes: Vec<String>,
    #[serde(default)]
    pub heart_notes: Vec<String>,
    #[serde(default)]
    pub base_notes: Vec<String>,
    #[serde(default)]
    pub bottle_image: String,
    #[serde(default)]
    pub hover_image: String,
    #[serde(default)]
    pub third_image: String,
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, message = "Price must be non-negative"))]
    pub actual_price: i64,
    pub discounted_price: Option<i64>,
    #[validate(range(min = 0, message = "Stock must be non-negative"))]
    #[serde(default)]
    pub stock: i64,
}

impl ProductPayload {
    fn check(&self) -> Result<(), ApiError> {
        self.validate()?;
        Gender::from_str(&self.gender).map_err(ApiError::Validation)?;
        if self.discounted_price.is_some_and(|p| p < 0) {
            return Err(ApiError::Validation(
                "Discounted price must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

async fn list_products(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(products))
}

async fn create_product(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    payload.check()?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, gender, impression_of, top_notes, heart_notes,
                               base_notes, bottle_image, hover_image, third_image, is_visible,
                               theme_color, rating, description, actual_price, discounted_price,
                               stock)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                 COALESCE($12, '#1a1a2e'), $13, $14, $15, $16, $17)
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.name)
    .bind(&payload.gender)
    .bind(&payload.impression_of)
    .bind(&payload.top_notes)
    .bind(&payload.heart_notes)
    .bind(&payload.base_notes)
    .bind(&payload.bottle_image)
    .bind(&payload.hover_image)
    .bind(&payload.third_image)
    .bind(payload.is_visible.unwrap_or(true))
    .bind(&payload.theme_color)
    .bind(payload.rating)
    .bind(&payload.description)
    .bind(payload.actual_price)
    .bind(payload.discounted_price)
    .bind(payload.stock)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    payload.check()?;
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, gender = $3, impression_of = $4, top_notes = $5,
                             heart_notes = $6, base_notes = $7, bottle_image = $8,
                             hover_image = $9, third_image = $10, is_visible = $11,
                             theme_color = COALESCE($12, theme_color), rating = $13,
                             description = $14, actual_price = $15, discounted_price = $16,
                             stock = $17, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.gender)
    .bind(&payload.impression_of)
    .bind(&payload.top_notes)
    .bind(&payload.heart_notes)
    .bind(&payload.base_notes)
    .bind(&payload.bottle_image)
    .bind(&payload.hover_image)
    .bind(&payload.third_image)
    .bind(payload.is_visible.unwrap_or(true))
    .bind(&payload.theme_color)
    .bind(payload.rating)
    .bind(&payload.description)
    .bind(payload.actual_price)
    .bind(payload.discounted_price)
    .bind(payload.stock)
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Product"))?;
    Ok(Json(product))
}

/// Products referenced by order history cannot vanish; those deletes are
/// refused and the admin hides the product with the visibility flag instead.
async fn delete_product(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(ApiError::NotFound("Product")),
        Ok(_) => Ok(Json(
            serde_json::json!({ "message": "Product deleted successfully" }),
        )),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            Err(ApiError::Conflict(
                "Product is referenced by existing orders. Hide it with the visibility flag instead."
                    .into(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

// ========== ORDER MANAGEMENT ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub customer_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl OrdersQuery {
    fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange {
            start: self.start_date.as_deref().map(day_start).transpose()?,
            end: self.end_date.as_deref().map(day_end).transpose()?,
        })
    }
}

async fn list_orders(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<OrderWithItems>>, ApiError> {
    if let Some(status) = &query.status {
        OrderStatus::from_str(status).map_err(ApiError::Validation)?;
    }
    let range = query.range()?;

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders
         WHERE ($1::text IS NULL OR status = $1)
           AND ($2::uuid IS NULL OR user_id = $2)
           AND ($3::timestamptz IS NULL OR created_at >= $3)
           AND ($4::timestamptz IS NULL OR created_at <= $4)
         ORDER BY created_at DESC",
    )
    .bind(&query.status)
    .bind(query.customer_id)
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(with_items(&state.db, orders).await?))
}

async fn export_orders(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Response, ApiError> {
    let range = query.range()?;

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders
         WHERE ($1::timestamptz IS NULL OR created_at >= $1)
           AND ($2::timestamptz IS NULL OR created_at <= $2)
         ORDER BY created_at DESC",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_all(&state.db)
    .await?;

    let with_items = with_items(&state.db, orders).await?;
    let rows: Vec<_> = with_items.into_iter().map(|o| (o.order, o.items)).collect();
    let csv = export::orders_to_csv(&rows);

    let filename = format!("orders-export-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

async fn get_order(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    let items = items_for_orders(&state.db, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    Ok(Json(OrderWithItems { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_order_status(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let status = OrderStatus::from_str(&req.status).map_err(ApiError::Validation)?;
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?
    .ok_or(ApiError::NotFound("Order"))?;
    Ok(Json(order))
}

/// Printable slip; public so the print link works without an auth header.
async fn delivery_slip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    let items = items_for_orders(&state.db, &[order.id])
        .await?
        .remove(&order.id)
        .unwrap_or_default();
    Ok(Html(export::render_delivery_slip(
        &order,
        &items,
        &state.store_name,
    )))
}

// ========== ANALYTICS ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub year: Option<i32>,
}

async fn get_analytics(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<analytics::AnalyticsReport>, ApiError> {
    let range = match query.year {
        Some(year) => DateRange::year(year)?,
        None => DateRange {
            start: query.start_date.as_deref().map(day_start).transpose()?,
            end: query.end_date.as_deref().map(day_end).transpose()?,
        },
    };
    let report = analytics::compute(&state.db, range).await?;
    Ok(Json(report))
}

// ========== HERO SECTION & ANNOUNCEMENT ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroPayload {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub background_image: Option<String>,
    pub background_video: Option<String>,
    pub primary_button_text: Option<String>,
    pub secondary_button_text: Option<String>,
}

/// Unlike the public read, the admin view persists the default hero so
/// subsequent edits have a row to target.
async fn get_hero(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<HeroSection>, ApiError> {
    Ok(Json(ensure_hero(&state).await?))
}

async fn update_hero(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<HeroPayload>,
) -> Result<Json<HeroSection>, ApiError> {
    let current = ensure_hero(&state).await?;

    let hero = sqlx::query_as::<_, HeroSection>(
        "UPDATE hero_sections SET title = COALESCE($2, title),
                                  subtitle = COALESCE($3, subtitle),
                                  background_image = COALESCE($4, background_image),
                                  background_video = COALESCE($5, background_video),
                                  primary_button_text = COALESCE($6, primary_button_text),
                                  secondary_button_text = COALESCE($7, secondary_button_text),
                                  updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(current.id)
    .bind(&payload.title)
    .bind(&payload.subtitle)
    .bind(&payload.background_image)
    .bind(&payload.background_video)
    .bind(&payload.primary_button_text)
    .bind(&payload.secondary_button_text)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(hero))
}

/// Returns the active hero, inserting the stock default first if none exists.
async fn ensure_hero(state: &AppState) -> Result<HeroSection, ApiError> {
    let existing = sqlx::query_as::<_, HeroSection>(
        "SELECT * FROM hero_sections WHERE is_active = TRUE ORDER BY updated_at DESC LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await?;
    if let Some(hero) = existing {
        return Ok(hero);
    }
    let hero = sqlx::query_as::<_, HeroSection>(
        "INSERT INTO hero_sections (id, title, subtitle, background_video,
                                    primary_button_text, secondary_button_text, is_active)
         VALUES ($1, $2, $3, $4, 'Shop Now', 'Vote Your Favorite', TRUE)
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind("Discover Scents That Tell Your Story")
    .bind("Let your presence linger beautifully. Explore our handcrafted fragrances designed to match every personality.")
    .bind("/videos/perfume-hero.mp4")
    .fetch_one(&state.db)
    .await?;
    Ok(hero)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementPayload {
    pub text: Option<String>,
    pub is_active: Option<bool>,
}

async fn update_announcement(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<AnnouncementPayload>,
) -> Result<Json<AnnouncementBanner>, ApiError> {
    let banner = sqlx::query_as::<_, AnnouncementBanner>(
        "INSERT INTO announcement_banners (id, text, is_active)
         VALUES (TRUE, COALESCE($1, 'Opening Sale Live'), COALESCE($2, FALSE))
         ON CONFLICT (id) DO UPDATE
             SET text = COALESCE($1, announcement_banners.text),
                 is_active = COALESCE($2, announcement_banners.is_active),
                 updated_at = NOW()
         RETURNING *",
    )
    .bind(&payload.text)
    .bind(payload.is_active)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(banner))
}

// ========== SETTINGS ==========

async fn get_settings_public(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let charge = settings::current_delivery_charge(&state.db).await?;
    Ok(Json(serde_json::json!({ "deliveryCharge": charge })))
}

async fn get_settings_full(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(settings::get_settings(&state.db).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryChargeRequest {
    pub delivery_charge: i64,
}

async fn update_delivery_charge(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<DeliveryChargeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = settings::update_delivery_charge(&state.db, req.delivery_charge).await?;
    Ok(Json(serde_json::json!({
        "message": "Delivery charge updated successfully",
        "deliveryCharge": updated.delivery_charge,
    })))
}
