//! Request signatures Shopify attaches to app traffic.
//!
//! - OAuth redirects carry `hmac`: HMAC-SHA256 over the other parameters,
//!   sorted by key, as `k=v` pairs joined with `&`.
//! - App proxy requests carry `signature`: HMAC-SHA256 over the other
//!   parameters, sorted by key, as `k=v` pairs with repeated keys' values
//!   joined by `,` and no separator between pairs.
//!
//! Both are hex encoded and keyed with the app's API secret.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// How long an OAuth `state` value stays valid.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

/// Decode a raw query string into key/value pairs.
#[must_use]
pub fn query_pairs(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// Hex HMAC-SHA256 of `message`.
fn sign(secret: &str, message: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
fn verify(secret: &str, message: &str, provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

fn find<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Verify the `hmac` parameter of an OAuth redirect.
#[must_use]
pub fn verify_oauth_query(pairs: &[(String, String)], secret: &str) -> bool {
    let Some(provided) = find(pairs, "hmac") else {
        return false;
    };

    let mut signed: Vec<_> = pairs
        .iter()
        .filter(|(k, _)| k != "hmac" && k != "signature")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    signed.sort();

    verify(secret, &signed.join("&"), provided)
}

/// Verify the `signature` parameter of an app proxy request.
#[must_use]
pub fn verify_proxy_query(pairs: &[(String, String)], secret: &str) -> bool {
    let Some(provided) = find(pairs, "signature") else {
        return false;
    };

    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (k, v) in pairs.iter().filter(|(k, _)| k != "signature") {
        grouped.entry(k).or_default().push(v);
    }
    let message: String = grouped
        .iter()
        .map(|(k, values)| format!("{k}={}", values.join(",")))
        .collect();

    verify(secret, &message, provided)
}

/// Signed OAuth `state`: `<nonce>.<expires>.<signature>`, bound to one shop.
///
/// Returns `None` only if the secret cannot key an HMAC.
#[must_use]
pub fn sign_oauth_state(shop: &str, now: i64, secret: &str) -> Option<String> {
    let nonce = Uuid::new_v4().simple().to_string();
    let expires = now + OAUTH_STATE_TTL_SECS;
    let signature = sign(secret, &format!("{shop}:{nonce}:{expires}"))?;
    Some(format!("{nonce}.{expires}.{signature}"))
}

/// Whether `state` was issued for `shop` and has not expired.
#[must_use]
pub fn verify_oauth_state(state: &str, shop: &str, now: i64, secret: &str) -> bool {
    let mut parts = state.splitn(3, '.');
    let (Some(nonce), Some(expires), Some(signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(expires_at) = expires.parse::<i64>() else {
        return false;
    };

    now <= expires_at && verify(secret, &format!("{shop}:{nonce}:{expires}"), signature)
}
