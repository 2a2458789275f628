//! Free gift rules.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::{FieldErrors, SectionRule, coerce};
use crate::types::{RuleId, Section};

/// What unlocks the gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftTrigger {
    /// Gift for paying online. Applied by the storefront script only.
    PaymentOnline,
    /// Gift once the cart subtotal reaches `min_purchase`.
    #[default]
    MinAmount,
}

/// A free gift rule.
///
/// Only one `min_amount` rule may exist per shop. It is synced as an
/// automatic Buy X Get Y discount: spending `min_purchase` on qualifying
/// products gets `qty` gift variants free, `limit` times per order at most.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeGiftRule {
    pub id: Option<RuleId>,
    pub enabled: bool,
    pub trigger: GiftTrigger,
    pub min_purchase: Option<Decimal>,
    /// Gift product or variant GID. Products resolve to their first variant
    /// at sync time.
    pub bonus: Option<String>,
    /// Gift units per application.
    pub qty: u32,
    /// Applications allowed per order.
    pub limit: u32,
    #[serde(rename = "freeProductDiscountID")]
    pub free_product_discount_id: Option<String>,
    /// Products that count toward the threshold. Empty means the whole store.
    pub all_product_ids: Vec<String>,
}

impl SectionRule for FreeGiftRule {
    const SECTION: Section = Section::FreeGift;
    const NUMERIC_FIELDS: &'static [&'static str] = &["minPurchase", "qty", "limit"];

    fn normalize(raw: &Value) -> Self {
        let trigger = coerce::choice(
            coerce::field(raw, "trigger"),
            &[
                ("payment_online", GiftTrigger::PaymentOnline),
                ("online", GiftTrigger::PaymentOnline),
                ("min_amount", GiftTrigger::MinAmount),
                ("amount", GiftTrigger::MinAmount),
            ],
            GiftTrigger::MinAmount,
        );
        // Older rows spell the remote id with a lowercase `d`
        let remote = coerce::field(raw, "freeProductDiscountID")
            .or_else(|| coerce::field(raw, "freeProductDiscountId"));

        Self {
            id: coerce::rule_id(coerce::field(raw, "id")),
            enabled: coerce::boolean(coerce::field(raw, "enabled"), true),
            trigger,
            min_purchase: match trigger {
                GiftTrigger::MinAmount => coerce::money(coerce::field(raw, "minPurchase")),
                GiftTrigger::PaymentOnline => None,
            },
            bonus: coerce::gid(coerce::field(raw, "bonus"), "ProductVariant"),
            qty: coerce::count(coerce::field(raw, "qty"), 1),
            limit: coerce::count(coerce::field(raw, "limit"), 1),
            free_product_discount_id: coerce::opt_text(remote),
            all_product_ids: coerce::gid_list(coerce::field(raw, "allProductIds"), "Product"),
        }
    }

    fn validate(&self, index: usize, errors: &mut FieldErrors) {
        if self.trigger == GiftTrigger::MinAmount {
            match self.min_purchase {
                None => errors.insert(index, "minPurchase", "a threshold is required"),
                Some(m) if m.is_sign_negative() => {
                    errors.insert(index, "minPurchase", "must be zero or greater");
                }
                Some(_) => {}
            }
        }
        if self.bonus.is_none() {
            errors.insert(index, "bonus", "select a gift product");
        }
        if self.qty < 1 {
            errors.insert(index, "qty", "must be at least 1");
        }
        if self.limit < 1 {
            errors.insert(index, "limit", "must be at least 1");
        }
    }

    fn validate_set(rules: &[Self], errors: &mut FieldErrors) {
        let threshold_rules = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.trigger == GiftTrigger::MinAmount);
        for (index, _) in threshold_rules.skip(1) {
            errors.insert(index, "trigger", "only one minimum amount gift is allowed");
        }
    }

    fn id(&self) -> Option<RuleId> {
        self.id
    }

    fn set_id(&mut self, id: Option<RuleId>) {
        self.id = id;
    }

    fn remote_id(&self) -> Option<&str> {
        self.free_product_discount_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: Option<String>) {
        self.free_product_discount_id = remote_id;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let rule = FreeGiftRule::normalize(&json!({"minPurchase": "", "bonus": "44"}));
        assert_eq!(rule.trigger, GiftTrigger::MinAmount);
        assert_eq!(rule.min_purchase, None);
        assert_eq!(rule.qty, 1);
        assert_eq!(rule.limit, 1);
        assert_eq!(rule.bonus.as_deref(), Some("gid://shopify/ProductVariant/44"));
    }

    #[test]
    fn test_min_amount_requires_threshold_and_bonus() {
        let rule = FreeGiftRule::normalize(&json!({"trigger": "min_amount"}));
        let mut errors = FieldErrors::default();
        rule.validate(0, &mut errors);
        assert!(errors.get("0.minPurchase").is_some());
        assert!(errors.get("0.bonus").is_some());
    }

    #[test]
    fn test_payment_online_ignores_threshold() {
        let rule = FreeGiftRule::normalize(&json!({
            "trigger": "payment_online",
            "minPurchase": 30,
            "bonus": "gid://shopify/Product/2",
        }));
        assert_eq!(rule.min_purchase, None);
        let mut errors = FieldErrors::default();
        rule.validate(0, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_zero_qty_rejected() {
        let rule = FreeGiftRule::normalize(&json!({"minPurchase": 10, "bonus": "1", "qty": 0}));
        let mut errors = FieldErrors::default();
        rule.validate(0, &mut errors);
        assert_eq!(errors.get("0.qty"), Some("must be at least 1"));
    }

    #[test]
    fn test_single_min_amount_rule() {
        let rules = vec![
            FreeGiftRule::normalize(&json!({"minPurchase": 10, "bonus": "1"})),
            FreeGiftRule::normalize(&json!({"trigger": "payment_online", "bonus": "2"})),
            FreeGiftRule::normalize(&json!({"minPurchase": 20, "bonus": "3"})),
        ];
        let mut errors = FieldErrors::default();
        FreeGiftRule::validate_set(&rules, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors.get("2.trigger").is_some());
    }

    #[test]
    fn test_legacy_remote_id_spelling() {
        let rule = FreeGiftRule::normalize(&json!({
            "freeProductDiscountId": "gid://shopify/DiscountAutomaticNode/8",
        }));
        assert_eq!(rule.remote_id(), Some("gid://shopify/DiscountAutomaticNode/8"));
    }

    #[test]
    fn test_normalize_idempotent() {
        let rule = FreeGiftRule::normalize(&json!({
            "enabled": "true",
            "minPurchase": "75.5",
            "bonus": {"id": "gid://shopify/ProductVariant/10"},
            "qty": "2",
            "allProductIds": ["5", "6"],
            "freeProductDiscountID": "gid://shopify/DiscountAutomaticNode/1",
        }));
        let again = FreeGiftRule::normalize(&serde_json::to_value(&rule).expect("serialize"));
        assert_eq!(rule, again);
    }
}
