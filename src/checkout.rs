//! Order admission: validate -> price -> persist -> adjust stock -> notify.
//!
//! The whole placement runs in a single transaction. Product rows are
//! locked (`FOR UPDATE`) in canonical id order before the lines are priced,
//! so the stock check and the later conditional decrement cannot be
//! interleaved by a concurrent order for the same product, and two orders
//! listing the same products in different orders cannot deadlock on each
//! other's row locks. The in-transaction existence check on the
//! candidate order number is an optimization only; the UNIQUE index on
//! `orders.order_number` is the authoritative guard, and an insert that
//! loses that race rolls back and retries the placement with a fresh draw.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{Order, OrderItem, PaymentMethod, Product, ShippingAddress};
use crate::settings;
use crate::AppState;

pub const ORDER_NUMBER_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ORDER_NUMBER_LEN: usize = 6;

/// Retry ceiling across number draws and lost insert races. With 36^6
/// possible numbers, hitting this means the orders table is corrupt or
/// pathologically full; the request fails loudly instead of spinning.
const MAX_NUMBER_ATTEMPTS: u32 = 16;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    /// Accepted for wire compatibility; every order is COD.
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(alias = "product")]
    pub product_id: Uuid,
    pub quantity: i64,
    /// Client-submitted price is advisory only; the unit price is always
    /// re-derived from the product record.
    #[serde(default)]
    pub price: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A validated, server-priced line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

impl PricedLine {
    pub fn subtotal(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

/// Validates one requested line against the product record and prices it.
/// Read-only: repeated calls with the same inputs give the same answer.
pub fn price_line(product: &Product, quantity: i64) -> Result<PricedLine, ApiError> {
    if quantity < 1 {
        return Err(ApiError::Validation(format!(
            "Quantity for {} must be at least 1",
            product.name
        )));
    }
    if quantity > product.stock {
        return Err(ApiError::InsufficientStock {
            name: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(PricedLine {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity,
        unit_price: product.unit_price(),
    })
}

/// Product ids in canonical lock order: sorted and deduplicated. Row locks
/// taken in this order are deadlock-free across concurrent placements no
/// matter how each request arranges its line items.
pub fn lock_order(items: &[OrderItemRequest]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Sum of line subtotals plus the delivery charge in effect at creation
/// time. Never recomputed after the order is persisted.
pub fn order_total(lines: &[PricedLine], delivery_charge: i64) -> i64 {
    lines.iter().map(PricedLine::subtotal).sum::<i64>() + delivery_charge
}

/// Draws a 6-character candidate from the 36-symbol alphabet. Each attempt
/// is a full redraw, never a per-character patch.
pub fn draw_order_number(rng: &mut impl Rng) -> String {
    (0..ORDER_NUMBER_LEN)
        .map(|_| ORDER_NUMBER_ALPHABET[rng.gen_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
        .collect()
}

async fn allocate_order_number(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<String, ApiError> {
    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let candidate = draw_order_number(&mut rand::thread_rng());
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
                .bind(&candidate)
                .fetch_one(&mut **tx)
                .await?;
        if !taken {
            return Ok(candidate);
        }
        warn!(candidate = %candidate, attempt, "order number collision, redrawing");
    }
    Err(ApiError::OrderNumberExhausted(MAX_NUMBER_ATTEMPTS))
}

/// Places an order end to end. Notification failures are swallowed after
/// the commit; acceptance never depends on email delivery.
pub async fn place_order(
    state: &AppState,
    user: Option<&crate::models::User>,
    req: &CreateOrderRequest,
) -> Result<OrderWithItems, ApiError> {
    req.validate()?;
    for item in &req.items {
        if item.quantity < 1 {
            return Err(ApiError::Validation(
                "Item quantity must be at least 1".into(),
            ));
        }
    }

    // Fetched once per request and threaded through the calculation.
    let delivery_charge = settings::current_delivery_charge(&state.db).await?;
    let user_id = user.map(|u| u.id);

    let mut attempts = 0u32;
    let placed = loop {
        match try_place(&state.db, user_id, req, delivery_charge).await? {
            Some(placed) => break placed,
            None => {
                attempts += 1;
                if attempts >= MAX_NUMBER_ATTEMPTS {
                    return Err(ApiError::OrderNumberExhausted(MAX_NUMBER_ATTEMPTS));
                }
                warn!(attempts, "lost order number insert race, retrying placement");
            }
        }
    };

    let customer_email = placed
        .order
        .shipping_address
        .email
        .clone()
        .or_else(|| user.map(|u| u.email.clone()));

    if let Err(e) = state.notifier.order_created(&placed.order, &placed.items) {
        warn!(error = %e, "admin order notification failed");
    }
    if let Some(email) = customer_email {
        if let Err(e) = state.notifier.order_confirmation(&placed.order, &email) {
            warn!(error = %e, "customer order confirmation failed");
        }
    }

    Ok(placed)
}

/// One placement attempt inside its own transaction. Returns `Ok(None)`
/// when the order-number insert lost a uniqueness race and the caller
/// should retry from scratch.
async fn try_place(
    db: &PgPool,
    user_id: Option<Uuid>,
    req: &CreateOrderRequest,
    delivery_charge: i64,
) -> Result<Option<OrderWithItems>, ApiError> {
    let mut tx = db.begin().await?;

    // Lock product rows in canonical order, then validate and price every
    // line in input order, before any write.
    let mut products = HashMap::new();
    for id in lock_order(&req.items) {
        let product =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(ApiError::ProductNotFound(id))?;
        products.insert(id, product);
    }

    let mut lines = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = products
            .get(&item.product_id)
            .ok_or(ApiError::ProductNotFound(item.product_id))?;
        lines.push(price_line(product, item.quantity)?);
    }
    let total_amount = order_total(&lines, delivery_charge);

    let order_number = allocate_order_number(&mut tx).await?;

    let inserted = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, user_id, shipping_address, total_amount,
                             status, payment_method, payment_status)
         VALUES ($1, $2, $3, $4, $5, 'pending', $6, 'pending')
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&order_number)
    .bind(user_id)
    .bind(sqlx::types::Json(&req.shipping_address))
    .bind(total_amount)
    .bind(PaymentMethod::Cod.as_str())
    .fetch_one(&mut *tx)
    .await;

    let order = match inserted {
        Ok(order) => order,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tx.rollback().await?;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::with_capacity(lines.len());
    for (position, line) in lines.iter().enumerate() {
        let item = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO order_items (id, order_id, product_id, product_name, quantity,
                                      unit_price, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(position as i64)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    // Conditional decrement: with the FOR UPDATE locks held this cannot
    // fail, but the predicate keeps stock from ever going negative.
    for line in &lines {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW()
             WHERE id = $1 AND stock >= $2",
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let available: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                .bind(line.product_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(ApiError::InsufficientStock {
                name: line.product_name.clone(),
                available,
                requested: line.quantity,
            });
        }
    }

    tx.commit().await?;
    Ok(Some(OrderWithItems { order, items }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn product(name: &str, price: i64, discounted: Option<i64>, stock: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            gender: "Unisex".into(),
            impression_of: String::new(),
            top_notes: vec![],
            heart_notes: vec![],
            base_notes: vec![],
            bottle_image: String::new(),
            hover_image: String::new(),
            third_image: String::new(),
            is_visible: true,
            theme_color: "#000".into(),
            rating: 0.0,
            votes: 0,
            description: String::new(),
            actual_price: price,
            discounted_price: discounted,
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_number_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let number = draw_order_number(&mut rng);
            assert_eq!(number.len(), ORDER_NUMBER_LEN);
            assert!(number
                .bytes()
                .all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_order_number_draws_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let numbers: std::collections::HashSet<String> =
            (0..100).map(|_| draw_order_number(&mut rng)).collect();
        // 36^6 values; 100 draws colliding would mean a broken generator.
        assert_eq!(numbers.len(), 100);
    }

    #[test]
    fn test_accepted_order_total() {
        // Stock 5 at price 100, delivery charge 200.
        let a = product("A", 100, None, 5);
        let line = price_line(&a, 3).unwrap();
        assert_eq!(line.subtotal(), 300);
        assert_eq!(order_total(&[line], 200), 500);
    }

    #[test]
    fn test_zero_stock_rejected() {
        let b = product("B", 100, None, 0);
        match price_line(&b, 1) {
            Err(ApiError::InsufficientStock {
                name,
                available,
                requested,
            }) => {
                assert_eq!(name, "B");
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_over_stock_rejected() {
        let a = product("A", 100, None, 2);
        match price_line(&a, 10) {
            Err(ApiError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(requested, 10);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_quantity_below_one_rejected() {
        let a = product("A", 100, None, 5);
        assert!(matches!(price_line(&a, 0), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_discounted_price_used() {
        let p = product("Velvet Oud", 2500, Some(1800), 10);
        let line = price_line(&p, 2).unwrap();
        assert_eq!(line.unit_price, 1800);
        assert_eq!(line.subtotal(), 3600);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let p = product("A", 100, None, 5);
        let first = price_line(&p, 3).unwrap();
        let second = price_line(&p, 3).unwrap();
        assert_eq!(first, second);
    }

    fn item(product_id: Uuid, quantity: i64) -> OrderItemRequest {
        OrderItemRequest {
            product_id,
            quantity,
            price: None,
        }
    }

    #[test]
    fn test_lock_order_is_canonical() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // Requests listing the same products in opposite order must lock
        // them identically, or they can deadlock on each other's rows.
        let forward = lock_order(&[item(a, 1), item(b, 2)]);
        let reverse = lock_order(&[item(b, 2), item(a, 1)]);
        assert_eq!(forward, reverse);
        assert!(forward.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_lock_order_dedupes_repeated_products() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = lock_order(&[item(a, 1), item(b, 1), item(a, 3)]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }

    #[test]
    fn test_total_sums_lines_in_order() {
        let lines = vec![
            price_line(&product("A", 100, None, 5), 3).unwrap(),
            price_line(&product("B", 250, Some(200), 4), 2).unwrap(),
        ];
        assert_eq!(order_total(&lines, 200), 300 + 400 + 200);
        assert_eq!(order_total(&[], 200), 200);
    }
}
