//! Installed shop records.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use smartcartify_core::ShopId;

use super::RepositoryError;

/// An installed shop.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Shop {
    pub id: ShopId,
    /// `*.myshopify.com` domain.
    pub domain: String,
    pub installed_at: DateTime<Utc>,
    pub uninstalled_at: Option<DateTime<Utc>>,
}

/// Repository for shop records.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an install. Reinstalling clears `uninstalled_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_installed(&self, domain: &str) -> Result<Shop, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(
            r"
            INSERT INTO shops (domain)
            VALUES ($1)
            ON CONFLICT (domain) DO UPDATE SET uninstalled_at = NULL
            RETURNING id, domain, installed_at, uninstalled_at
            ",
        )
        .bind(domain)
        .fetch_one(self.pool)
        .await?;

        Ok(shop)
    }

    /// Get a shop by domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, domain: &str) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(
            "SELECT id, domain, installed_at, uninstalled_at FROM shops WHERE domain = $1",
        )
        .bind(domain)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Domains of every shop that has not uninstalled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_installed(&self) -> Result<Vec<String>, RepositoryError> {
        let domains = sqlx::query_scalar::<_, String>(
            "SELECT domain FROM shops WHERE uninstalled_at IS NULL ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(domains)
    }
}
