//! Database operations for the admin `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `shops` - Installed shops
//! - `sessions` - Offline access tokens from the OAuth install flow
//! - `shipping_rules`, `discount_rules`, `free_gift_rules`, `bxgy_rules` -
//!   Canonical rule documents, one row per rule
//! - `style_settings` - Cart drawer style document, one row per shop
//! - `plan_subscriptions` - Billing state, one row per shop
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p smartcartify-cli -- migrate
//! ```

pub mod plans;
pub mod rules;
pub mod sessions;
pub mod shops;
pub mod style;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use plans::{PlanRepository, PlanSubscription};
pub use rules::{Persisted, RuleRepository, RuleTable};
pub use sessions::SessionRepository;
pub use shops::{Shop, ShopRepository};
pub use style::StyleRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
