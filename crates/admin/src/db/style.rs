//! Cart drawer style settings.

use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use smartcartify_core::StyleSettings;

use super::RepositoryError;

pub struct StyleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StyleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Settings for `shop`, defaults when none are stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &str) -> Result<StyleSettings, RepositoryError> {
        let data = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT data FROM style_settings WHERE shop = $1",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(data.map_or_else(StyleSettings::default, |Json(v)| {
            StyleSettings::from_raw(&v)
        }))
    }

    /// Replace the settings for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, shop: &str, settings: &StyleSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO style_settings (shop, data)
            VALUES ($1, $2)
            ON CONFLICT (shop) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(Json(settings))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
