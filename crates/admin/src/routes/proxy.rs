//! Storefront app proxy route.
//!
//! Shopify forwards `https://<shop>/apps/<prefix>/smart` to `/proxy/smart`,
//! appending `shop`, `timestamp` and a `signature` over the query.

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use secrecy::ExposeSecret;
use tracing::{instrument, warn};

use super::require_shop;
use crate::error::{AppError, Result};
use crate::services::StorefrontPayload;
use crate::shopify::signature::{query_pairs, verify_proxy_query};
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=30";

pub fn router() -> Router<AppState> {
    Router::new().route("/proxy/smart", get(smart))
}

/// GET /proxy/smart - enabled rules and style settings for the cart drawer.
#[instrument(skip_all)]
async fn smart(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse> {
    let pairs = query_pairs(raw.as_deref().unwrap_or_default());
    if !verify_proxy_query(&pairs, state.config().shopify.api_secret.expose_secret()) {
        warn!("Invalid app proxy signature");
        return Err(AppError::Unauthorized("invalid signature".to_string()));
    }

    let shop = pairs
        .iter()
        .find(|(k, _)| k == "shop")
        .map(|(_, v)| v.as_str())
        .unwrap_or_default();
    let shop = require_shop(shop)?;

    let payload = state
        .proxy_cache()
        .get_or_load(state.pool(), shop)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        Json(StorefrontPayload::clone(&payload)),
    ))
}
