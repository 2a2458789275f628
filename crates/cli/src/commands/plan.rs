//! Billing plan maintenance.
//!
//! Support tooling for charges the billing webhook never delivered.
//!
//! # Usage
//!
//! ```bash
//! smartcartify-cli plan set -s cool-store.myshopify.com -p Pro --status ACTIVE
//! ```

use secrecy::SecretString;
use smartcartify_admin::db::{self, PlanRepository};
use smartcartify_admin::routes::is_valid_shop_domain;
use smartcartify_core::PlanStatus;

use super::CliError;

/// Parse and check a shop domain argument.
pub fn parse_shop(shop: &str) -> Result<String, CliError> {
    let shop = shop.trim().to_ascii_lowercase();
    if is_valid_shop_domain(&shop) {
        Ok(shop)
    } else {
        Err(CliError::InvalidArgument {
            field: "shop",
            value: shop,
        })
    }
}

/// Create or replace the plan of `shop`.
///
/// # Errors
///
/// Returns `CliError` for a bad shop or status, missing configuration or a
/// database failure.
pub async fn set(
    shop: &str,
    plan_name: &str,
    status: &str,
    charge_id: Option<&str>,
) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let shop = parse_shop(shop)?;
    let status: PlanStatus = status.parse().map_err(|_| CliError::InvalidArgument {
        field: "status",
        value: status.to_string(),
    })?;

    let database_url: SecretString = std::env::var("DATABASE_URL")
        .map_err(|_| CliError::MissingEnvVar("DATABASE_URL"))?
        .into();
    let pool = db::create_pool(&database_url).await?;

    let plan = PlanRepository::new(&pool)
        .upsert(&shop, plan_name, status, charge_id)
        .await?;

    tracing::info!(
        shop = %plan.shop,
        plan = %plan.plan_name,
        status = %plan.status.as_str(),
        "Plan updated"
    );
    Ok(())
}
