//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (database)
//!
//! # OAuth install
//! GET    /auth?shop=                  - Redirect to Shopify's grant screen
//! GET    /auth/callback               - Exchange the code, store the token
//!
//! # Rules (embedded admin page, session token required)
//! GET    /api/rules                   - Every section for the session's shop
//! POST   /api/rules                   - Save a section, one rule, or remove one
//! DELETE /api/rules/{section}/{id}    - Remove one rule by row id
//!
//! # Billing (session token required)
//! GET    /api/plan                    - Current plan
//! POST   /api/billing/confirm         - Wait for the plan to become active
//!
//! # Storefront
//! GET    /proxy/smart                 - App proxy payload for the cart drawer
//! ```

pub mod auth;
pub mod billing;
pub mod proxy;
pub mod rules;

use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/api/rules", rules::router())
        .nest("/api", billing::router())
        .merge(proxy::router())
}

/// `?shop=` query parameter.
#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    pub shop: String,
}

/// `?shop=` a client may still send next to its session token.
#[derive(Debug, Default, Deserialize)]
pub struct ShopHint {
    pub shop: Option<String>,
}

/// Whether `shop` is a bare `*.myshopify.com` domain.
#[must_use]
pub fn is_valid_shop_domain(shop: &str) -> bool {
    let Some(name) = shop.strip_suffix(".myshopify.com") else {
        return false;
    };
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Reject anything that is not a shop domain before it reaches a query or
/// a Shopify URL.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an invalid domain.
pub fn require_shop(shop: &str) -> Result<&str, AppError> {
    let shop = shop.trim();
    if is_valid_shop_domain(shop) {
        Ok(shop)
    } else {
        Err(AppError::BadRequest(format!("invalid shop domain: {shop}")))
    }
}
