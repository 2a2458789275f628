//! Shopify Admin API GraphQL client with OAuth authentication.
//!
//! [`AdminClient`] is created once at startup from the app credentials.
//! [`ShopClient`] is created per request from a shop's stored access token.

use std::sync::Arc;

use graphql_client::{GraphQLQuery, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::ShopifyAppConfig;

use super::{AdminShopifyError, GraphQLError, GraphQLErrorLocation, LookupCache};

/// A mutation user error, whichever operation returned it.
#[derive(Debug, Clone)]
struct UserError {
    field: Option<Vec<String>>,
    message: String,
}

/// Collect an operation's generated `userErrors` into [`UserError`]s.
macro_rules! user_errors {
    ($errors:expr) => {
        $errors
            .into_iter()
            .map(|e| $crate::shopify::admin::UserError {
                field: e.field,
                message: e.message,
            })
            .collect::<Vec<_>>()
    };
}
use user_errors;

mod catalog;
mod delivery;
mod discounts;
pub mod queries;

/// OAuth token for Admin API access.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    /// The access token for API calls
    pub access_token: String,
    /// Granted scopes
    pub scope: String,
    /// Unix timestamp when token was obtained
    pub obtained_at: i64,
    /// Associated shop domain
    pub shop: String,
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("obtained_at", &self.obtained_at)
            .field("shop", &self.shop)
            .finish()
    }
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    scope: String,
}

/// Shopify app client.
///
/// Holds the app credentials, the shared HTTP client and the lookup cache.
/// Cheap to clone.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    api_version: String,
    api_key: String,
    api_secret: SecretString,
    lookups: LookupCache,
}

impl AdminClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyAppConfig, lookups: LookupCache) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client: reqwest::Client::new(),
                api_version: config.api_version.clone(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                lookups,
            }),
        }
    }

    /// Get the app client ID.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.inner.api_key
    }

    /// Get the memoized lookup cache.
    #[must_use]
    pub fn lookups(&self) -> &LookupCache {
        &self.inner.lookups
    }

    /// Bind this client to one shop's access token.
    #[must_use]
    pub fn for_shop(&self, shop: &str, access_token: SecretString) -> ShopClient {
        ShopClient {
            admin: self.clone(),
            shop: shop.to_string(),
            access_token,
        }
    }

    // =========================================================================
    // OAuth Flow
    // =========================================================================

    /// Generate the OAuth authorization URL.
    ///
    /// Redirect the merchant to this URL to begin the install flow.
    #[must_use]
    pub fn authorization_url(
        &self,
        shop: &str,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
    ) -> String {
        let scope = scopes.join(",");
        format!(
            "https://{shop}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&scope),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::OAuth` if the token exchange fails.
    /// Returns `AdminShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        shop: &str,
        code: &str,
    ) -> Result<OAuthToken, AdminShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");

        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::OAuth(format!(
                "Token exchange failed: {text}"
            )));
        }

        let token_response: OAuthTokenResponse = response.json().await?;

        Ok(OAuthToken {
            access_token: token_response.access_token,
            scope: token_response.scope,
            obtained_at: chrono::Utc::now().timestamp(),
            shop: shop.to_string(),
        })
    }
}

/// Admin API client for a single shop.
#[derive(Clone)]
pub struct ShopClient {
    admin: AdminClient,
    shop: String,
    access_token: SecretString,
}

impl std::fmt::Debug for ShopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopClient")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ShopClient {
    /// Shop domain this client talks to.
    #[must_use]
    pub fn shop(&self) -> &str {
        &self.shop
    }

    fn lookups(&self) -> &LookupCache {
        self.admin.lookups()
    }

    /// Execute a GraphQL operation against this shop.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError> {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            self.shop, self.admin.inner.api_version
        );

        let body = Q::build_query(variables);

        let response = self
            .admin
            .inner
            .client
            .post(&endpoint)
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                shop = %self.shop,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify Admin API returned non-success status"
            );
            return Err(AdminShopifyError::GraphQL(vec![GraphQLError::message(
                format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
            )]));
        }

        let response: Response<Q::ResponseData> = serde_json::from_str(&response_text)?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");
            return Err(AdminShopifyError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        locations: e.locations.map_or_else(Vec::new, |locs| {
                            locs.into_iter()
                                .map(|l| GraphQLErrorLocation {
                                    line: i64::from(l.line),
                                    column: i64::from(l.column),
                                })
                                .collect()
                        }),
                        path: e.path.map_or_else(Vec::new, |p| {
                            p.into_iter()
                                .map(|fragment| match fragment {
                                    graphql_client::PathFragment::Key(s) => {
                                        serde_json::Value::String(s)
                                    }
                                    graphql_client::PathFragment::Index(i) => {
                                        serde_json::Value::Number(i.into())
                                    }
                                })
                                .collect()
                        }),
                    })
                    .collect(),
            ));
        }

        response
            .data
            .ok_or_else(|| AdminShopifyError::GraphQL(vec![GraphQLError::message("No data in response")]))
    }
}

/// Turn mutation user errors into `AdminShopifyError::UserError`.
///
/// Each error renders as `field.path: message`, joined with `; `.
fn check_user_errors(errors: &[UserError]) -> Result<(), AdminShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            if field.is_empty() {
                e.message.clone()
            } else {
                format!("{}: {}", field, e.message)
            }
        })
        .collect();
    Err(AdminShopifyError::UserError(messages.join("; ")))
}

/// Error for a mutation that succeeded without returning the expected node.
fn missing_payload(operation: &str) -> AdminShopifyError {
    AdminShopifyError::GraphQL(vec![GraphQLError::message(format!(
        "No result returned from {operation}"
    ))])
}
