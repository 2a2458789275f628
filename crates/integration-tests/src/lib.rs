//! Integration tests for Smartcartify.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! docker compose up -d postgres
//! cargo run -p smartcartify-cli -- migrate
//!
//! # Start the admin server (for HTTP tests)
//! cargo run -p smartcartify-admin
//!
//! # Run the ignored tests with the server's app credentials
//! SHOPIFY_API_KEY=... SHOPIFY_API_SECRET=... \
//!     cargo test -p smartcartify-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `http_api` - Admin HTTP API against a running server
//! - `rule_store` - Rule store reconciliation against `PostgreSQL`

use jsonwebtoken::{EncodingKey, Header};
use secrecy::SecretString;
use smartcartify_admin::db::{self, ShopRepository};
use sqlx::PgPool;

/// Base URL of the running admin server.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A shop domain no other test run uses.
#[must_use]
pub fn unique_shop() -> String {
    format!("it-{}.myshopify.com", uuid::Uuid::new_v4().simple())
}

/// An App Bridge session token for `shop`, signed with the server's app
/// credentials from `SHOPIFY_API_KEY` and `SHOPIFY_API_SECRET`.
///
/// # Errors
///
/// Returns an error if either variable is unset or signing fails.
pub fn session_token(shop: &str) -> Result<String, Box<dyn std::error::Error>> {
    let api_key = std::env::var("SHOPIFY_API_KEY")?;
    let api_secret = std::env::var("SHOPIFY_API_SECRET")?;
    let now = chrono::Utc::now().timestamp();
    let claims = serde_json::json!({
        "iss": format!("https://{shop}/admin"),
        "dest": format!("https://{shop}"),
        "aud": api_key,
        "sub": "1",
        "exp": now + 60,
        "nbf": now,
        "iat": now,
        "jti": uuid::Uuid::new_v4().to_string(),
    });
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(api_secret.as_bytes()),
    )?)
}

/// Pool for the test database, from `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or the database is unreachable.
pub async fn test_pool() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url: SecretString = std::env::var("DATABASE_URL")?.into();
    Ok(db::create_pool(&url).await?)
}

/// Register a fresh installed shop and return its domain.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn installed_shop(pool: &PgPool) -> Result<String, Box<dyn std::error::Error>> {
    let shop = unique_shop();
    ShopRepository::new(pool).upsert_installed(&shop).await?;
    Ok(shop)
}
