//! Storefront app proxy payload.
//!
//! The cart drawer script fetches the shop's active rules and style settings
//! through the Shopify app proxy on every page view. Payloads are cached for
//! 30 seconds and dropped whenever the shop saves a section.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use smartcartify_core::{BxgyRule, DiscountRule, FreeGiftRule, ShippingRule, StyleSettings};
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{RepositoryError, RuleRepository, StyleRepository};

/// How long a payload is served from memory.
pub const PROXY_CACHE_TTL: Duration = Duration::from_secs(30);

/// What the cart drawer needs for one shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontPayload {
    pub shipping: Vec<ShippingRule>,
    pub discounts: Vec<DiscountRule>,
    pub free_gifts: Vec<FreeGiftRule>,
    pub bxgy: Vec<BxgyRule>,
    pub style: StyleSettings,
}

impl StorefrontPayload {
    /// Load enabled rules and style settings for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any section fails to load.
    #[instrument(skip(pool))]
    pub async fn load(pool: &PgPool, shop: &str) -> Result<Self, RepositoryError> {
        Ok(Self {
            shipping: RuleRepository::<ShippingRule>::new(pool)
                .list_enabled(shop)
                .await?,
            discounts: RuleRepository::<DiscountRule>::new(pool)
                .list_enabled(shop)
                .await?,
            free_gifts: RuleRepository::<FreeGiftRule>::new(pool)
                .list_enabled(shop)
                .await?,
            bxgy: RuleRepository::<BxgyRule>::new(pool)
                .list_enabled(shop)
                .await?,
            style: StyleRepository::new(pool).get(shop).await?,
        })
    }
}

/// Short-lived per-shop payload cache.
#[derive(Clone)]
pub struct ProxyCache {
    cache: Cache<String, Arc<StorefrontPayload>>,
}

impl Default for ProxyCache {
    fn default() -> Self {
        Self::new(PROXY_CACHE_TTL)
    }
}

impl ProxyCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(5_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached payload for `shop`, loading it on a miss.
    ///
    /// Concurrent misses for one shop share a single load.
    ///
    /// # Errors
    ///
    /// Returns the load error; failures are not cached.
    pub async fn get_or_load(
        &self,
        pool: &PgPool,
        shop: &str,
    ) -> Result<Arc<StorefrontPayload>, Arc<RepositoryError>> {
        self.cache
            .try_get_with(shop.to_string(), async {
                debug!(shop = %shop, "Proxy payload cache miss");
                StorefrontPayload::load(pool, shop).await.map(Arc::new)
            })
            .await
    }

    /// Drop the cached payload of `shop`.
    pub async fn invalidate(&self, shop: &str) {
        self.cache.invalidate(shop).await;
    }

    pub async fn insert(&self, shop: &str, payload: StorefrontPayload) {
        self.cache.insert(shop.to_string(), Arc::new(payload)).await;
    }

    pub async fn get(&self, shop: &str) -> Option<Arc<StorefrontPayload>> {
        self.cache.get(shop).await
    }
}
