//! Billing plan state per shop.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use smartcartify_core::PlanStatus;

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    shop: String,
    plan_name: String,
    status: String,
    charge_id: Option<String>,
    current_period_end: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// A shop's billing subscription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSubscription {
    pub shop: String,
    pub plan_name: String,
    pub status: PlanStatus,
    pub charge_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for PlanSubscription {
    type Error = RepositoryError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("{e}")))?;

        Ok(Self {
            shop: row.shop,
            plan_name: row.plan_name,
            status,
            charge_id: row.charge_id,
            current_period_end: row.current_period_end,
            updated_at: row.updated_at,
        })
    }
}

pub struct PlanRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PlanRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current subscription for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored status is unknown.
    pub async fn get(&self, shop: &str) -> Result<Option<PlanSubscription>, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r"
            SELECT shop, plan_name, status, charge_id, current_period_end, updated_at
            FROM plan_subscriptions
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create or replace the subscription for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        shop: &str,
        plan_name: &str,
        status: PlanStatus,
        charge_id: Option<&str>,
    ) -> Result<PlanSubscription, RepositoryError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r"
            INSERT INTO plan_subscriptions (shop, plan_name, status, charge_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE
            SET plan_name = EXCLUDED.plan_name,
                status = EXCLUDED.status,
                charge_id = COALESCE(EXCLUDED.charge_id, plan_subscriptions.charge_id),
                updated_at = NOW()
            RETURNING shop, plan_name, status, charge_id, current_period_end, updated_at
            ",
        )
        .bind(shop)
        .bind(plan_name)
        .bind(status.as_str())
        .bind(charge_id)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
