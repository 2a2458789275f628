//! Embedded admin session tokens.
//!
//! App Bridge sends `Authorization: Bearer <jwt>` with every request from the
//! embedded admin page. The token is HS256-signed with the app's API secret,
//! its `aud` is the API key, and `dest` is `https://<shop>`. The shop a
//! request acts on comes from the verified token, never from the body or
//! query.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ShopifyAppConfig;
use crate::error::AppError;
use crate::routes::is_valid_shop_domain;
use crate::state::AppState;

/// Seconds of clock skew tolerated on `exp` and `nbf`.
const LEEWAY_SECS: u64 = 5;

/// Claims Shopify puts in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// `https://<shop>/admin`
    pub iss: String,
    /// `https://<shop>`
    pub dest: String,
    /// App API key.
    pub aud: String,
    /// Staff user id.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

/// Shop a request was authenticated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionShop(pub String);

impl SessionShop {
    /// The authenticated shop, rejecting a request that names another one.
    ///
    /// A blank or absent `claimed` shop is accepted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when `claimed` differs from the
    /// token's shop.
    pub fn check(&self, claimed: Option<&str>) -> Result<&str, AppError> {
        match claimed.map(str::trim).filter(|s| !s.is_empty()) {
            Some(other) if other != self.0 => Err(AppError::Unauthorized(format!(
                "session is for {}, not {other}",
                self.0
            ))),
            _ => Ok(&self.0),
        }
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Unauthorized(message.to_string())
}

/// The bearer token of a request.
fn bearer(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))
}

/// Verify a session token and return the shop it was issued for.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` for a bad signature, wrong audience,
/// expired token, or a `dest` that is not a shop domain matching `iss`.
pub fn verify_session_token(token: &str, config: &ShopifyAppConfig) -> Result<String, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.api_key.as_str()]);
    validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
    validation.validate_nbf = true;
    validation.leeway = LEEWAY_SECS;

    let claims = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.api_secret.expose_secret().as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!(error = %e, "Session token rejected");
        unauthorized("Invalid or expired session token")
    })?
    .claims;

    let shop = claims
        .dest
        .strip_prefix("https://")
        .filter(|shop| is_valid_shop_domain(shop))
        .ok_or_else(|| unauthorized("Session token names no shop"))?;
    if !claims.iss.starts_with(&claims.dest) {
        return Err(unauthorized("Session token issuer does not match its shop"));
    }
    Ok(shop.to_string())
}

impl FromRequestParts<AppState> for SessionShop {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(&parts.headers)?;
        verify_session_token(token, &state.config().shopify).map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use secrecy::SecretString;

    const SECRET: &str = "app-secret-for-tokens";

    fn config() -> ShopifyAppConfig {
        ShopifyAppConfig {
            api_version: "2026-01".to_string(),
            api_key: "client-id".to_string(),
            api_secret: SecretString::from(SECRET),
            scopes: Vec::new(),
        }
    }

    fn claims(shop: &str) -> SessionClaims {
        let now = chrono::Utc::now().timestamp();
        SessionClaims {
            iss: format!("https://{shop}/admin"),
            dest: format!("https://{shop}"),
            aud: "client-id".to_string(),
            sub: Some("42".to_string()),
            exp: now + 60,
            nbf: now - 5,
            iat: now - 5,
            jti: Some("jti-1".to_string()),
            sid: None,
        }
    }

    fn sign(claims: &SessionClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_token_yields_shop() {
        let token = sign(&claims("cool-store.myshopify.com"), SECRET);
        assert_eq!(
            verify_session_token(&token, &config()).unwrap(),
            "cool-store.myshopify.com"
        );
    }

    #[test]
    fn test_missing_token_rejected() {
        assert!(matches!(
            bearer(&HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            bearer(&headers("Basic abc")),
            Err(AppError::Unauthorized(_))
        ));
        assert_eq!(bearer(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn test_bad_signature_rejected() {
        let token = sign(&claims("cool-store.myshopify.com"), "some-other-secret");
        assert!(matches!(
            verify_session_token(&token, &config()),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_audience_and_expired_rejected() {
        let mut other_app = claims("cool-store.myshopify.com");
        other_app.aud = "another-app".to_string();
        assert!(verify_session_token(&sign(&other_app, SECRET), &config()).is_err());

        let mut expired = claims("cool-store.myshopify.com");
        expired.exp = chrono::Utc::now().timestamp() - 3600;
        assert!(verify_session_token(&sign(&expired, SECRET), &config()).is_err());
    }

    #[test]
    fn test_dest_must_be_shop_matching_issuer() {
        let mut foreign = claims("cool-store.myshopify.com");
        foreign.dest = "https://evil.example.com".to_string();
        assert!(verify_session_token(&sign(&foreign, SECRET), &config()).is_err());

        let mut crossed = claims("cool-store.myshopify.com");
        crossed.iss = "https://other-store.myshopify.com/admin".to_string();
        assert!(verify_session_token(&sign(&crossed, SECRET), &config()).is_err());
    }

    #[test]
    fn test_mismatched_shop_rejected() {
        let session = SessionShop("cool-store.myshopify.com".to_string());
        assert_eq!(session.check(None).unwrap(), "cool-store.myshopify.com");
        assert_eq!(session.check(Some("  ")).unwrap(), "cool-store.myshopify.com");
        assert_eq!(
            session.check(Some("cool-store.myshopify.com")).unwrap(),
            "cool-store.myshopify.com"
        );
        assert!(matches!(
            session.check(Some("other-store.myshopify.com")),
            Err(AppError::Unauthorized(_))
        ));
    }
}
