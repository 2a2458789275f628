//! Rule section routes for the embedded admin page.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use smartcartify_core::{RuleId, Section};
use tracing::instrument;

use super::ShopHint;
use crate::error::Result;
use crate::middleware::SessionShop;
use crate::services::{AllRules, RemoveTarget, SaveRequest, SaveResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(save))
        .route("/{section}/{id}", delete(remove))
}

/// GET /api/rules - every section of the session's shop.
#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    session: SessionShop,
    Query(hint): Query<ShopHint>,
) -> Result<Json<AllRules>> {
    let shop = session.check(hint.shop.as_deref())?;
    Ok(Json(state.rules().load_all(shop).await?))
}

/// POST /api/rules - save a section or a single rule, or remove one rule
/// when a `delete*` field is set.
#[instrument(skip(state, request), fields(shop = %session.0, section = %request.section))]
async fn save(
    State(state): State<AppState>,
    session: SessionShop,
    Json(mut request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    request.shop = session.check(Some(&request.shop))?.to_string();
    Ok(Json(state.rules().handle(request).await?))
}

/// DELETE /api/rules/{section}/{id} - remove one rule by row id.
#[instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    session: SessionShop,
    Path((section, id)): Path<(Section, i64)>,
    Query(hint): Query<ShopHint>,
) -> Result<Json<SaveResponse>> {
    let shop = session.check(hint.shop.as_deref())?;
    let response = state
        .rules()
        .remove(shop, section, RemoveTarget::Row(RuleId::new(id)))
        .await?;
    Ok(Json(response))
}
