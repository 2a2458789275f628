//! Re-run Shopify sync for stored rules.
//!
//! Used after fixing a Shopify-side problem (missing products, a deleted
//! delivery zone) that left rules without remote objects.
//!
//! # Usage
//!
//! ```bash
//! # One section of one shop
//! smartcartify-cli resync -s cool-store.myshopify.com --section discount
//!
//! # Every section of every installed shop
//! smartcartify-cli resync
//! ```
//!
//! # Environment Variables
//!
//! Same as the admin server (`DATABASE_URL`, `SHOPIFY_API_KEY`, ...).

use smartcartify_admin::config::AdminConfig;
use smartcartify_admin::db::{self, ShopRepository};
use smartcartify_admin::services::{ProxyCache, RuleService, SaveLocks};
use smartcartify_admin::shopify::{AdminClient, LookupCache};
use smartcartify_core::Section;

use super::CliError;
use super::plan::parse_shop;

const SYNCED_SECTIONS: [Section; 4] = [
    Section::Shipping,
    Section::Discount,
    Section::FreeGift,
    Section::Bxgy,
];

/// Resync `section` (or every section) of `shop` (or every installed shop).
///
/// Sync failures are logged per rule and do not stop the run.
///
/// # Errors
///
/// Returns `CliError` for bad arguments, missing configuration or a database
/// failure.
pub async fn run(shop: Option<&str>, section: Option<&str>) -> Result<(), CliError> {
    let config = AdminConfig::from_env()?;

    let sections = match section {
        Some(s) => vec![s.parse::<Section>().map_err(|_| CliError::InvalidArgument {
            field: "section",
            value: s.to_string(),
        })?],
        None => SYNCED_SECTIONS.to_vec(),
    };

    let pool = db::create_pool(&config.database_url).await?;
    let shops = match shop {
        Some(shop) => vec![parse_shop(shop)?],
        None => ShopRepository::new(&pool).list_installed().await?,
    };

    let shopify = AdminClient::new(&config.shopify, LookupCache::new(config.lookup_cache_ttl));
    let service = RuleService::new(
        pool,
        shopify,
        SaveLocks::new(),
        ProxyCache::default(),
        config.shipping_sync_enabled,
    );

    let mut failed = 0_usize;
    for shop in &shops {
        for &section in &sections {
            match service.resync(shop, section).await {
                Ok(report) => match report.error_message() {
                    None => tracing::info!(
                        shop = %shop,
                        section = %section,
                        rules = report.results.len(),
                        "Resynced"
                    ),
                    Some(e) => {
                        failed += 1;
                        tracing::warn!(shop = %shop, section = %section, error = %e, "Resync had errors");
                    }
                },
                Err(e) => {
                    failed += 1;
                    tracing::error!(shop = %shop, section = %section, error = %e, "Resync failed");
                }
            }
        }
    }

    tracing::info!(shops = shops.len(), failed, "Resync complete");
    Ok(())
}
