//! The settings singleton.
//!
//! A single row (keyed by TRUE) holds the flat per-order delivery charge.
//! It is created lazily with the default on first access, and the charge is
//! fetched once per checkout request and threaded through the total
//! calculation rather than read mid-flight.

use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::Settings;

pub const DEFAULT_DELIVERY_CHARGE: i64 = 200;

/// Fetches the settings row, inserting the default one if none exists yet.
pub async fn get_settings(db: &PgPool) -> Result<Settings, ApiError> {
    let settings = sqlx::query_as::<_, Settings>(
        "INSERT INTO settings (id, delivery_charge) VALUES (TRUE, $1)
         ON CONFLICT (id) DO UPDATE SET id = settings.id
         RETURNING *",
    )
    .bind(DEFAULT_DELIVERY_CHARGE)
    .fetch_one(db)
    .await?;
    Ok(settings)
}

pub async fn current_delivery_charge(db: &PgPool) -> Result<i64, ApiError> {
    Ok(get_settings(db).await?.delivery_charge)
}

pub async fn update_delivery_charge(db: &PgPool, delivery_charge: i64) -> Result<Settings, ApiError> {
    if delivery_charge < 0 {
        return Err(ApiError::Validation(
            "Delivery charge must be a non-negative number".into(),
        ));
    }
    // Touch the row into existence first so the update always has a target.
    get_settings(db).await?;
    let settings = sqlx::query_as::<_, Settings>(
        "UPDATE settings SET delivery_charge = $1, updated_at = NOW() WHERE id = TRUE RETURNING *",
    )
    .bind(delivery_charge)
    .fetch_one(db)
    .await?;
    Ok(settings)
}
