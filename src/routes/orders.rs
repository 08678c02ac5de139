//! Checkout and customer order history.
//!
//! Checkout is open to guests: the bearer token is optional and a broken
//! one is ignored rather than rejected, so the order is simply created
//! without a user association.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeUser};
use crate::checkout::{self, CreateOrderRequest, OrderWithItems};
use crate::error::ApiError;
use crate::models::{Order, OrderItem};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/my-orders", get(my_orders))
        .route("/:id", get(get_order))
}

async fn create_order(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>), ApiError> {
    let placed = checkout::place_order(&state, user.as_ref(), &req).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

async fn my_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderWithItems>>, ApiError> {
    let orders =
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(with_items(&state.db, orders).await?))
}

async fn get_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("Order"))?;
    let items = items_for_orders(&state.db, &[order.id]).await?;
    let items = items.into_values().next().unwrap_or_default();
    Ok(Json(OrderWithItems { order, items }))
}

/// Fetches items for a batch of orders, grouped by order id and kept in
/// line-item input order.
pub(crate) async fn items_for_orders(
    db: &PgPool,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, ApiError> {
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(order_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}

pub(crate) async fn with_items(
    db: &PgPool,
    orders: Vec<Order>,
) -> Result<Vec<OrderWithItems>, ApiError> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped = items_for_orders(db, &ids).await?;
    Ok(orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect())
}
