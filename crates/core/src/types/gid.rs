//! Shopify global ids (`gid://shopify/<Type>/<id>`).

use std::fmt;

const GID_PREFIX: &str = "gid://shopify/";

/// A parsed Shopify global id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShopifyGid {
    resource: String,
    id: String,
}

impl ShopifyGid {
    /// Parse a GID string. Returns `None` for anything that is not a
    /// well-formed `gid://shopify/<Type>/<id>`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.trim().strip_prefix(GID_PREFIX)?;
        let (resource, id) = rest.split_once('/')?;
        // Shopify appends query strings to some ids (e.g. `?shop=`)
        let id = id.split('?').next().unwrap_or_default();
        if resource.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self {
            resource: resource.to_string(),
            id: id.to_string(),
        })
    }

    /// Build a GID for a resource type and a legacy numeric id.
    #[must_use]
    pub fn new(resource: &str, id: impl fmt::Display) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Resource type (e.g. `Product`, `DiscountAutomaticNode`).
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Resource id portion.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Coerce a product/collection/variant reference into a GID string.
    ///
    /// Accepts either a GID or a bare numeric id as sent by the resource
    /// picker in older admin builds.
    #[must_use]
    pub fn coerce(raw: &str, resource: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(gid) = Self::parse(trimmed) {
            return Some(gid.to_string());
        }
        trimmed
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| Self::new(resource, trimmed).to_string())
    }
}

impl fmt::Display for ShopifyGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GID_PREFIX}{}/{}", self.resource, self.id)
    }
}

/// Whether a Shopify discount is applied by code or automatically.
///
/// Shopify uses separate mutations for each, so every remote discount id
/// must be classified before it can be deleted or toggled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscountKind {
    /// Customer enters a code at checkout.
    Code,
    /// Applied automatically when cart conditions match.
    Automatic,
}

impl DiscountKind {
    /// Classify a discount node GID.
    ///
    /// Returns `None` for ids that are not discount nodes.
    #[must_use]
    pub fn from_gid(raw: &str) -> Option<Self> {
        let gid = ShopifyGid::parse(raw)?;
        match gid.resource() {
            "DiscountCodeNode" => Some(Self::Code),
            "DiscountAutomaticNode" => Some(Self::Automatic),
            _ => None,
        }
    }

    /// Classify by the GraphQL `__typename` of the discount payload.
    #[must_use]
    pub fn from_typename(typename: &str) -> Option<Self> {
        if typename.starts_with("DiscountCode") {
            Some(Self::Code)
        } else if typename.starts_with("DiscountAutomatic") {
            Some(Self::Automatic)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gid() {
        let gid = ShopifyGid::parse("gid://shopify/Product/123").expect("valid gid");
        assert_eq!(gid.resource(), "Product");
        assert_eq!(gid.id(), "123");
        assert_eq!(gid.to_string(), "gid://shopify/Product/123");
    }

    #[test]
    fn test_parse_gid_strips_query() {
        let gid = ShopifyGid::parse("gid://shopify/DeliveryMethodDefinition/9?foo=bar")
            .expect("valid gid");
        assert_eq!(gid.id(), "9");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ShopifyGid::parse("123").is_none());
        assert!(ShopifyGid::parse("gid://shopify/Product/").is_none());
    }

    #[test]
    fn test_coerce_numeric_id() {
        assert_eq!(
            ShopifyGid::coerce("456", "Product").as_deref(),
            Some("gid://shopify/Product/456")
        );
        assert_eq!(
            ShopifyGid::coerce("gid://shopify/Collection/7", "Product").as_deref(),
            Some("gid://shopify/Collection/7")
        );
        assert!(ShopifyGid::coerce("abc", "Product").is_none());
    }

    #[test]
    fn test_discount_kind() {
        assert_eq!(
            DiscountKind::from_gid("gid://shopify/DiscountCodeNode/1"),
            Some(DiscountKind::Code)
        );
        assert_eq!(
            DiscountKind::from_gid("gid://shopify/DiscountAutomaticNode/1"),
            Some(DiscountKind::Automatic)
        );
        assert_eq!(DiscountKind::from_gid("gid://shopify/Product/1"), None);
        assert_eq!(
            DiscountKind::from_typename("DiscountAutomaticBxgy"),
            Some(DiscountKind::Automatic)
        );
    }
}
