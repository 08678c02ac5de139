//! Mistiq Commerce - perfume storefront and back-office API.

pub mod analytics;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod notify;
pub mod routes;
pub mod settings;

use axum::Router;
use sqlx::PgPool;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt: JwtKeys,
    pub notifier: Notifier,
    pub store_name: String,
}

impl AppState {
    pub fn new(db: PgPool, config: &Config) -> Self {
        AppState {
            db,
            jwt: JwtKeys::new(&config.jwt_secret),
            notifier: Notifier::new(config.admin_email.clone(), config.store_name.clone()),
            store_name: config.store_name.clone(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}
