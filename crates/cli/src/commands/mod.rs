//! CLI command implementations.

pub mod migrate;
pub mod plan;
pub mod resync;

use thiserror::Error;

use smartcartify_admin::config::ConfigError;
use smartcartify_admin::db::RepositoryError;
use smartcartify_admin::services::RuleError;

/// Errors from any CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Argument did not parse.
    #[error("Invalid {field}: {value}")]
    InvalidArgument { field: &'static str, value: String },
}
