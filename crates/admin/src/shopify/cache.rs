//! Per-shop memoization of slow-changing Admin API lookups.
//!
//! Keys are prefixed with the shop domain so one shop's entries can be
//! dropped without touching the others.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use super::DeliveryZone;

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Currency(String),
    ProductIds(Arc<Vec<String>>),
    Variant(String),
    Zone(DeliveryZone),
}

/// Lookup cache shared by every shop client.
#[derive(Clone)]
pub struct LookupCache {
    cache: Cache<String, CacheValue>,
}

impl LookupCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    fn key(shop: &str, kind: &str, detail: &str) -> String {
        format!("{shop}|{kind}|{detail}")
    }

    pub async fn currency(&self, shop: &str) -> Option<String> {
        match self.cache.get(&Self::key(shop, "currency", "")).await {
            Some(CacheValue::Currency(code)) => Some(code),
            _ => None,
        }
    }

    pub async fn put_currency(&self, shop: &str, code: String) {
        self.cache
            .insert(Self::key(shop, "currency", ""), CacheValue::Currency(code))
            .await;
    }

    pub async fn product_ids(&self, shop: &str) -> Option<Arc<Vec<String>>> {
        match self.cache.get(&Self::key(shop, "products", "")).await {
            Some(CacheValue::ProductIds(ids)) => Some(ids),
            _ => None,
        }
    }

    pub async fn put_product_ids(&self, shop: &str, ids: Arc<Vec<String>>) {
        self.cache
            .insert(Self::key(shop, "products", ""), CacheValue::ProductIds(ids))
            .await;
    }

    /// Variant resolved for a product or variant GID.
    pub async fn variant(&self, shop: &str, gid: &str) -> Option<String> {
        match self.cache.get(&Self::key(shop, "variant", gid)).await {
            Some(CacheValue::Variant(id)) => Some(id),
            _ => None,
        }
    }

    pub async fn put_variant(&self, shop: &str, gid: &str, variant_id: String) {
        self.cache
            .insert(Self::key(shop, "variant", gid), CacheValue::Variant(variant_id))
            .await;
    }

    pub async fn zone(&self, shop: &str) -> Option<DeliveryZone> {
        match self.cache.get(&Self::key(shop, "zone", "")).await {
            Some(CacheValue::Zone(zone)) => Some(zone),
            _ => None,
        }
    }

    pub async fn put_zone(&self, shop: &str, zone: DeliveryZone) {
        self.cache
            .insert(Self::key(shop, "zone", ""), CacheValue::Zone(zone))
            .await;
    }

    /// Drop every entry belonging to `shop`.
    pub fn invalidate_shop(&self, shop: &str) {
        let prefix = format!("{shop}|");
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            tracing::warn!(error = %e, "Failed to invalidate lookup cache");
        } else {
            debug!(shop = %shop, "Invalidated lookup cache");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_are_scoped_per_shop() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache.put_currency("a.myshopify.com", "USD".to_string()).await;
        cache.put_currency("b.myshopify.com", "EUR".to_string()).await;

        assert_eq!(cache.currency("a.myshopify.com").await.unwrap(), "USD");
        assert_eq!(cache.currency("b.myshopify.com").await.unwrap(), "EUR");
        assert!(cache.zone("a.myshopify.com").await.is_none());
    }

    #[tokio::test]
    async fn test_variant_lookup_keyed_by_gid() {
        let cache = LookupCache::new(Duration::from_secs(60));
        cache
            .put_variant(
                "a.myshopify.com",
                "gid://shopify/Product/1",
                "gid://shopify/ProductVariant/11".to_string(),
            )
            .await;
        assert_eq!(
            cache
                .variant("a.myshopify.com", "gid://shopify/Product/1")
                .await
                .unwrap(),
            "gid://shopify/ProductVariant/11"
        );
        assert!(
            cache
                .variant("a.myshopify.com", "gid://shopify/Product/2")
                .await
                .is_none()
        );
    }
}
