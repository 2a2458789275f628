//! Shopify Admin API client.
//!
//! # Architecture
//!
//! - [`AdminClient`] holds the app credentials and the shared HTTP client. It
//!   performs the OAuth install flow.
//! - [`ShopClient`] binds an `AdminClient` to one shop's offline access token
//!   and issues GraphQL operations for that shop.
//! - [`LookupCache`] memoizes slow-changing lookups (shop currency, product
//!   ids, gift variants, default delivery zone) per shop.
//! - [`signature`] verifies the HMACs on OAuth redirects and app proxy
//!   requests.
//!
//! GraphQL operations implement `graphql_client::GraphQLQuery` so requests go
//! through `QueryBody` and responses through `graphql_client::Response`.

mod admin;
mod cache;
pub mod signature;
pub mod types;

pub use admin::{AdminClient, OAuthToken, ShopClient};
pub use cache::LookupCache;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// OAuth token exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl AdminShopifyError {
    /// Whether the error says the target object is already gone.
    ///
    /// Deletes and deactivations of stale ids hit this routinely.
    #[must_use]
    pub fn is_missing_object(&self) -> bool {
        let message = match self {
            Self::NotFound(_) => return true,
            Self::UserError(m) => m.to_ascii_lowercase(),
            Self::GraphQL(errors) => format_graphql_errors(errors).to_ascii_lowercase(),
            _ => return false,
        };
        message.contains("does not exist")
            || message.contains("not found")
            || message.contains("invalid id")
    }

    /// Whether the error is Shopify rejecting a duplicate discount title.
    #[must_use]
    pub fn is_title_collision(&self) -> bool {
        match self {
            Self::UserError(m) => {
                let m = m.to_ascii_lowercase();
                m.contains("must be unique") || (m.contains("title") && m.contains("taken"))
            }
            _ => false,
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
