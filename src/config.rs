//! Environment-driven configuration.

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_email: String,
    pub store_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("PORT is not a valid port number")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "orders@example.com".to_string());
        let store_name =
            std::env::var("STORE_NAME").unwrap_or_else(|_| "Mistiq Perfumeries".to_string());

        Ok(Config {
            database_url,
            port,
            jwt_secret,
            admin_email,
            store_name,
        })
    }
}
