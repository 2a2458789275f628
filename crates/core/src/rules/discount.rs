//! Automatic and code discount rules.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::{AppliesTo, FieldErrors, ProgressText, SectionRule, coerce};
use crate::types::{RuleId, Section};

const MAX_PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// How the discount is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    Automatic,
    Code,
}

/// What the discount takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Percent,
    Amount,
    FreeShipping,
}

/// Which items the discount applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    #[default]
    All,
    Products,
    Collections,
}

/// A cart discount rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRule {
    pub id: Option<RuleId>,
    pub enabled: bool,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value_type: ValueType,
    /// Percentage (0-100] or fixed amount depending on `value_type`.
    pub value: Decimal,
    /// Human-readable value, e.g. `10%` or `5.00`.
    pub display_value: String,
    pub min_purchase: Option<Decimal>,
    pub scope: DiscountScope,
    pub applies_to: AppliesTo,
    pub discount_code: String,
    pub shopify_discount_code_id: Option<String>,
    pub progress_text: ProgressText,
    pub campaign_name: String,
}

fn display_value(value_type: ValueType, value: Decimal) -> String {
    match value_type {
        ValueType::Percent => format!("{}%", value.normalize()),
        ValueType::Amount => format!("{value:.2}"),
        ValueType::FreeShipping => "Free shipping".to_string(),
    }
}

impl SectionRule for DiscountRule {
    const SECTION: Section = Section::Discount;
    const NUMERIC_FIELDS: &'static [&'static str] = &["value", "minPurchase"];

    fn normalize(raw: &Value) -> Self {
        let discount_type = coerce::choice(
            coerce::field(raw, "type"),
            &[
                ("automatic", DiscountType::Automatic),
                ("code", DiscountType::Code),
            ],
            DiscountType::Automatic,
        );
        let value_type = coerce::choice(
            coerce::field(raw, "valueType"),
            &[
                ("percent", ValueType::Percent),
                ("percentage", ValueType::Percent),
                ("amount", ValueType::Amount),
                ("fixed", ValueType::Amount),
                ("free_shipping", ValueType::FreeShipping),
                ("shipping", ValueType::FreeShipping),
            ],
            ValueType::Percent,
        );
        let value = match value_type {
            ValueType::FreeShipping => Decimal::ZERO,
            _ => coerce::money(coerce::field(raw, "value")).unwrap_or_default(),
        };
        // Free shipping discounts cannot target items
        let scope = match value_type {
            ValueType::FreeShipping => DiscountScope::All,
            _ => coerce::choice(
                coerce::field(raw, "scope"),
                &[
                    ("all", DiscountScope::All),
                    ("products", DiscountScope::Products),
                    ("collections", DiscountScope::Collections),
                ],
                DiscountScope::All,
            ),
        };

        let mut applies_to = AppliesTo::from_raw(raw);
        match scope {
            DiscountScope::All => applies_to = AppliesTo::default(),
            DiscountScope::Products => applies_to.collections.clear(),
            DiscountScope::Collections => applies_to.products.clear(),
        }

        let discount_code = match discount_type {
            DiscountType::Code => coerce::text(coerce::field(raw, "discountCode")),
            DiscountType::Automatic => String::new(),
        };

        Self {
            id: coerce::rule_id(coerce::field(raw, "id")),
            enabled: coerce::boolean(coerce::field(raw, "enabled"), true),
            discount_type,
            value_type,
            value,
            display_value: display_value(value_type, value),
            min_purchase: coerce::money(coerce::field(raw, "minPurchase")),
            scope,
            applies_to,
            discount_code,
            shopify_discount_code_id: coerce::opt_text(coerce::field(
                raw,
                "shopifyDiscountCodeId",
            )),
            progress_text: ProgressText::from_raw(
                raw,
                [
                    "You're {{remaining}} away from {{discount}} off",
                    "You've unlocked {{discount}} off!",
                    "Spend {{threshold}} to get {{discount}} off",
                ],
            ),
            campaign_name: coerce::text(coerce::field(raw, "campaignName")),
        }
    }

    fn validate(&self, index: usize, errors: &mut FieldErrors) {
        if self.discount_type == DiscountType::Code && self.discount_code.is_empty() {
            errors.insert(index, "discountCode", "is required for code discounts");
        }
        match self.value_type {
            ValueType::Percent if self.value <= Decimal::ZERO || self.value > MAX_PERCENT => {
                errors.insert(index, "value", "must be between 0 and 100");
            }
            ValueType::Amount if self.value <= Decimal::ZERO => {
                errors.insert(index, "value", "must be greater than zero");
            }
            _ => {}
        }
        if self.min_purchase.is_some_and(|m| m.is_sign_negative()) {
            errors.insert(index, "minPurchase", "must be zero or greater");
        }
        match self.scope {
            DiscountScope::Products if self.applies_to.products.is_empty() => {
                errors.insert(index, "appliesTo.products", "select at least one product");
            }
            DiscountScope::Collections if self.applies_to.collections.is_empty() => {
                errors.insert(index, "appliesTo.collections", "select at least one collection");
            }
            _ => {}
        }
    }

    fn validate_set(rules: &[Self], errors: &mut FieldErrors) {
        let mut codes = std::collections::HashSet::new();
        for (index, rule) in rules.iter().enumerate() {
            if rule.discount_type == DiscountType::Code
                && !rule.discount_code.is_empty()
                && !codes.insert(rule.discount_code.to_ascii_uppercase())
            {
                errors.insert(index, "discountCode", "is already used by another rule");
            }
        }
    }

    fn id(&self) -> Option<RuleId> {
        self.id
    }

    fn set_id(&mut self, id: Option<RuleId>) {
        self.id = id;
    }

    fn remote_id(&self) -> Option<&str> {
        self.shopify_discount_code_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: Option<String>) {
        self.shopify_discount_code_id = remote_id;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}
