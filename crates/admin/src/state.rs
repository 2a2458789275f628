//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{ProxyCache, RuleService, SaveLocks};
use crate::shopify::{AdminClient, LookupCache};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    shopify: AdminClient,
    rules: RuleService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Admin configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let shopify = AdminClient::new(&config.shopify, LookupCache::new(config.lookup_cache_ttl));
        let rules = RuleService::new(
            pool.clone(),
            shopify.clone(),
            SaveLocks::new(),
            ProxyCache::default(),
            config.shipping_sync_enabled,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                rules,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &AdminClient {
        &self.inner.shopify
    }

    #[must_use]
    pub fn rules(&self) -> &RuleService {
        &self.inner.rules
    }

    /// Storefront payload cache, shared with the rule service.
    #[must_use]
    pub fn proxy_cache(&self) -> &ProxyCache {
        self.inner.rules.proxy_cache()
    }
}
