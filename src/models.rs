//! Persistent records and their enums.
//!
//! Rows map 1:1 to tables; status-like columns are stored as TEXT and
//! validated at the request boundary through the enums below, which is why
//! the row fields stay `String`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub gender: String,
    pub impression_of: String,
    pub top_notes: Vec<String>,
    pub heart_notes: Vec<String>,
    pub base_notes: Vec<String>,
    pub bottle_image: String,
    pub hover_image: String,
    pub third_image: String,
    pub is_visible: bool,
    pub theme_color: String,
    pub rating: f64,
    pub votes: i64,
    pub description: String,
    pub actual_price: i64,
    pub discounted_price: Option<i64>,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Display price: the discounted price when one is set, else the
    /// actual price. Orders always capture this server-derived value.
    pub fn unit_price(&self) -> i64 {
        self.discounted_price.unwrap_or(self.actual_price)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub shipping_address: Json<ShippingAddress>,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub position: i64,
}

/// Denormalized address snapshot stored on the order as JSONB.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub nearest_landmark: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub stars: i32,
    pub comments: String,
    pub product: String,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub background_image: String,
    pub background_video: String,
    pub primary_button_text: String,
    pub secondary_button_text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementBanner {
    #[serde(skip_serializing)]
    pub id: bool,
    pub text: String,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing)]
    pub id: bool,
    pub delivery_charge: i64,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Enums (validated at the request boundary, stored as TEXT)
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unisex => "Unisex",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Unisex" => Ok(Gender::Unisex),
            other => Err(format!("Invalid gender: {other}")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Invalid order status: {other}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentMethod {
    #[default]
    Cod,
    Card,
    Paypal,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(actual: i64, discounted: Option<i64>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Test".into(),
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
            actual_price: actual,
            discounted_price: discounted,
            stock: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unit_price_prefers_discount() {
        assert_eq!(product(1500, None).unit_price(), 1500);
        assert_eq!(product(1500, Some(1200)).unit_price(), 1200);
    }

    #[test]
    fn test_gender_roundtrip() {
        for g in ["Male", "Female", "Unisex"] {
            assert_eq!(Gender::from_str(g).unwrap().as_str(), g);
        }
        assert!(Gender::from_str("other").is_err());
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!(
            OrderStatus::from_str("shipped").unwrap(),
            OrderStatus::Shipped
        );
        assert!(OrderStatus::from_str("Shipped").is_err());
    }
}
