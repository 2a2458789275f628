//! Canonical rule shapes and the rule normalizer.
//!
//! Forms and stored rows arrive as loosely-typed JSON. Each rule type turns
//! that into one canonical shape with every default filled in, so two
//! submissions that mean the same thing compare equal and produce the same
//! deduplication key.
//!
//! The entry point for a submitted section is [`normalize_payload`]:
//!
//! 1. reject supplied-but-non-numeric values in numeric fields
//! 2. normalize each rule
//! 3. drop later rules whose key duplicates an earlier one
//! 4. validate each canonical rule, then the set as a whole

pub mod coerce;

mod bxgy;
mod discount;
mod free_gift;
mod shipping;
mod style;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::types::{RuleId, Section};

pub use bxgy::{BxgyRule, BxgyScope, GiftType};
pub use discount::{DiscountRule, DiscountScope, DiscountType, ValueType};
pub use free_gift::{FreeGiftRule, GiftTrigger};
pub use shipping::{RateType, RewardType, ShippingMethod, ShippingRule};
pub use style::StyleSettings;

/// Behavior shared by every synchronizable rule type.
pub trait SectionRule: Clone + std::fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Admin section this rule type belongs to.
    const SECTION: Section;

    /// Raw field names that must hold numbers when supplied.
    const NUMERIC_FIELDS: &'static [&'static str];

    /// Build the canonical rule from raw JSON, filling defaults.
    fn normalize(raw: &Value) -> Self;

    /// Validate one canonical rule at `index`.
    fn validate(&self, index: usize, errors: &mut FieldErrors);

    /// Validate constraints that span the whole submitted list.
    fn validate_set(_rules: &[Self], _errors: &mut FieldErrors) {}

    /// Local row id, if persisted.
    fn id(&self) -> Option<RuleId>;

    fn set_id(&mut self, id: Option<RuleId>);

    /// Remote Shopify identifier (discount node or delivery method definition).
    fn remote_id(&self) -> Option<&str>;

    fn set_remote_id(&mut self, remote_id: Option<String>);

    fn enabled(&self) -> bool;

    /// Copy of the rule with local and remote identity cleared.
    fn without_identity(&self) -> Self {
        let mut rule = self.clone();
        rule.set_id(None);
        rule.set_remote_id(None);
        rule
    }

    /// Deterministic deduplication key: the canonical JSON of the rule
    /// without identity fields.
    fn key(&self) -> String {
        serde_json::to_string(&self.without_identity()).unwrap_or_default()
    }
}

/// Per-field validation messages keyed `"<index>.<field>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Record an error for `field` of the rule at `index`.
    pub fn insert(&mut self, index: usize, field: &str, message: impl Into<String>) {
        self.0.insert(format!("{index}.{field}"), message.into());
    }

    /// Record an error that is not tied to one rule.
    pub fn insert_global(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Countdown copy shown in the cart drawer progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressText {
    /// Shown while the cart is below the threshold.
    pub before: String,
    /// Shown once the threshold is reached.
    pub after: String,
    /// Shown when the cart is far below the threshold.
    pub below: String,
}

impl ProgressText {
    /// Read progress copy from either a nested `progressText` object or the
    /// flat `progressTextBefore`/`After`/`Below` form fields.
    pub(crate) fn from_raw(raw: &Value, defaults: [&str; 3]) -> Self {
        let nested = coerce::field(raw, "progressText");
        let pick = |nested_key: &str, flat_key: &str, default: &str| {
            nested
                .and_then(|n| coerce::opt_text(n.get(nested_key)))
                .or_else(|| coerce::opt_text(raw.get(flat_key)))
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            before: pick("before", "progressTextBefore", defaults[0]),
            after: pick("after", "progressTextAfter", defaults[1]),
            below: pick("below", "progressTextBelow", defaults[2]),
        }
    }
}

/// Products and collections a rule targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliesTo {
    pub products: Vec<String>,
    pub collections: Vec<String>,
}

impl AppliesTo {
    pub(crate) fn from_raw(raw: &Value) -> Self {
        let applies = coerce::field(raw, "appliesTo");
        Self {
            products: coerce::gid_list(applies.and_then(|a| a.get("products")), "Product"),
            collections: coerce::gid_list(applies.and_then(|a| a.get("collections")), "Collection"),
        }
    }
}

/// Drop rules whose key duplicates an earlier rule. First occurrence wins.
#[must_use]
pub fn dedupe<R: SectionRule>(rules: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::new();
    rules.into_iter().filter(|r| seen.insert(r.key())).collect()
}

/// Record shape errors for one raw rule: non-objects and supplied values in
/// numeric fields that are not numbers.
pub fn check_raw<R: SectionRule>(index: usize, item: &Value, errors: &mut FieldErrors) {
    if !item.is_object() {
        errors.insert(index, "rule", "must be an object");
        return;
    }
    for name in R::NUMERIC_FIELDS {
        if coerce::is_invalid_number(item.get(*name)) {
            errors.insert(index, name, "must be a number");
        }
    }
}

/// Validate canonical rules one by one, then as a set.
///
/// # Errors
///
/// Returns the collected [`FieldErrors`] if any rule is invalid.
pub fn validate_rules<R: SectionRule>(rules: &[R]) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    for (index, rule) in rules.iter().enumerate() {
        rule.validate(index, &mut errors);
    }
    R::validate_set(rules, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Normalize, deduplicate and validate a submitted rule list.
///
/// # Errors
///
/// Returns the collected [`FieldErrors`] if any rule is malformed or invalid.
pub fn normalize_payload<R: SectionRule>(raw: &[Value]) -> Result<Vec<R>, FieldErrors> {
    let mut errors = FieldErrors::default();
    for (index, item) in raw.iter().enumerate() {
        check_raw::<R>(index, item, &mut errors);
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let rules = dedupe(raw.iter().map(R::normalize).collect());
    validate_rules(&rules)?;
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_text_nested_wins_over_flat() {
        let raw = json!({
            "progressText": {"before": "nested"},
            "progressTextBefore": "flat",
            "progressTextAfter": "done",
        });
        let text = ProgressText::from_raw(&raw, ["a", "b", "c"]);
        assert_eq!(text.before, "nested");
        assert_eq!(text.after, "done");
        assert_eq!(text.below, "c");
    }

    #[test]
    fn test_normalize_payload_rejects_non_numeric() {
        let raw = vec![json!({"enabled": true, "amount": "ten"})];
        let err = normalize_payload::<ShippingRule>(&raw).expect_err("invalid amount");
        assert_eq!(err.get("0.amount"), Some("must be a number"));
    }

    #[test]
    fn test_normalize_payload_rejects_non_objects() {
        let raw = vec![json!("shipping")];
        let err = normalize_payload::<ShippingRule>(&raw).expect_err("not an object");
        assert_eq!(err.get("0.rule"), Some("must be an object"));
    }

    #[test]
    fn test_dedupe_ignores_identity() {
        let raw = vec![
            json!({"id": 1, "rewardType": "free", "minSubtotal": "50", "shopifyMethodDefinitionId": "gid://shopify/DeliveryMethodDefinition/1"}),
            json!({"id": 2, "rewardType": "free", "minSubtotal": 50}),
            json!({"rewardType": "free", "minSubtotal": 75}),
        ];
        let rules = normalize_payload::<ShippingRule>(&raw).expect("valid");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, Some(RuleId::new(1)));
    }

    #[test]
    fn test_field_errors_display() {
        let mut errors = FieldErrors::default();
        errors.insert(0, "value", "required");
        errors.insert_global("payload", "empty");
        assert_eq!(errors.to_string(), "0.value: required; payload: empty");
        assert_eq!(errors.len(), 2);
    }
}
