//! Offline access tokens per shop.

use secrecy::SecretString;
use sqlx::PgPool;

use super::RepositoryError;

/// Repository for shop access tokens.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store or replace the offline token for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn store(
        &self,
        shop: &str,
        access_token: &str,
        scope: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO sessions (shop, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(access_token)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Offline token for `shop`, if the app is installed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn access_token(&self, shop: &str) -> Result<Option<SecretString>, RepositoryError> {
        let token = sqlx::query_scalar::<_, String>(
            "SELECT access_token FROM sessions WHERE shop = $1",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(token.map(SecretString::from))
    }

    /// Forget the token for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
