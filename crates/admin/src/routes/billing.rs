//! Billing state routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use super::ShopHint;
use crate::db::{PlanRepository, PlanSubscription};
use crate::error::Result;
use crate::middleware::SessionShop;
use crate::services::await_active_plan;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plan", get(plan))
        .route("/billing/confirm", post(confirm))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    /// Whether the plan allows using the app.
    pub active: bool,
    pub plan: Option<PlanSubscription>,
}

/// GET /api/plan - billing state of the session's shop.
#[instrument(skip(state))]
async fn plan(
    State(state): State<AppState>,
    session: SessionShop,
    Query(hint): Query<ShopHint>,
) -> Result<Json<PlanResponse>> {
    let shop = session.check(hint.shop.as_deref())?;
    let plan = PlanRepository::new(state.pool()).get(shop).await?;
    Ok(Json(PlanResponse {
        active: plan.as_ref().is_some_and(|p| p.status.is_usable()),
        plan,
    }))
}

/// POST /api/billing/confirm - wait for a just-approved charge to land.
///
/// Any body is ignored; the shop comes from the session token.
#[instrument(skip(state))]
async fn confirm(
    State(state): State<AppState>,
    session: SessionShop,
) -> Result<Json<PlanResponse>> {
    let shop = session.check(None)?;
    let (active, plan) = await_active_plan(state.pool(), shop).await?;
    Ok(Json(PlanResponse { active, plan }))
}
