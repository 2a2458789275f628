//! OAuth install routes.
//!
//! `GET /auth?shop=` sends the merchant to Shopify's grant screen with a
//! signed `state`. Shopify redirects back to `GET /auth/callback`, which
//! checks the `hmac` and `state`, exchanges the code for an offline token
//! and records the shop as installed.

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::Redirect,
    routing::get,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{instrument, warn};

use super::{ShopQuery, require_shop};
use crate::db::{SessionRepository, ShopRepository};
use crate::error::{AppError, Result};
use crate::shopify::signature::{
    query_pairs, sign_oauth_state, verify_oauth_query, verify_oauth_state,
};
use crate::state::AppState;

/// Build the OAuth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(install))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub shop: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth?shop= - Start the install flow.
#[instrument(skip(state))]
async fn install(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Redirect> {
    let shop = require_shop(&query.shop)?;
    let config = state.config();

    let oauth_state = sign_oauth_state(
        shop,
        chrono::Utc::now().timestamp(),
        config.shopify.api_secret.expose_secret(),
    )
    .ok_or_else(|| AppError::Internal("cannot sign OAuth state".to_string()))?;

    let auth_url = state.shopify().authorization_url(
        shop,
        &config.oauth_callback_url(),
        &config.shopify.scopes,
        &oauth_state,
    );

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&auth_url))
}

/// GET /auth/callback - Finish the install flow.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Redirect> {
    // Check for errors from Shopify
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or_default();
        warn!(error = %error, description = %description, "Shopify OAuth denied");
        return Err(AppError::Unauthorized("authorization was denied".to_string()));
    }

    let secret = state.config().shopify.api_secret.expose_secret();

    // Verify HMAC signature from Shopify
    if !verify_oauth_query(&query_pairs(raw.as_deref().unwrap_or_default()), secret) {
        warn!("Invalid HMAC signature in OAuth callback");
        return Err(AppError::Unauthorized("invalid signature".to_string()));
    }

    let shop = require_shop(params.shop.as_deref().unwrap_or_default())?;
    let (Some(code), Some(callback_state)) = (&params.code, &params.state) else {
        return Err(AppError::BadRequest("missing code or state".to_string()));
    };

    if !verify_oauth_state(callback_state, shop, chrono::Utc::now().timestamp(), secret) {
        warn!(shop = %shop, "OAuth state mismatch or expired");
        return Err(AppError::Unauthorized("invalid state".to_string()));
    }

    let token = state.shopify().exchange_code(shop, code).await?;

    SessionRepository::new(state.pool())
        .store(shop, &token.access_token, &token.scope)
        .await?;
    ShopRepository::new(state.pool())
        .upsert_installed(shop)
        .await?;

    // A reinstall can change currency, products or delivery zones
    state.shopify().lookups().invalidate_shop(shop);
    state.proxy_cache().invalidate(shop).await;

    tracing::info!(shop = %shop, "Shop installed");
    Ok(Redirect::to(&format!(
        "https://{shop}/admin/apps/{}",
        state.shopify().api_key()
    )))
}
