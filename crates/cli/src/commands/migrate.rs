//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! smartcartify-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/admin/migrations/`, embedded at compile time.

use sqlx::PgPool;

use super::CliError;

/// Run the admin database migrations.
///
/// # Errors
///
/// Returns `CliError` if `DATABASE_URL` is unset, the connection fails or a
/// migration fails.
pub async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| CliError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
