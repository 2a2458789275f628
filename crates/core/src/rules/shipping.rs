//! Shipping threshold rules.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::{FieldErrors, ProgressText, SectionRule, coerce};
use crate::types::{RuleId, Section};

/// What the shopper gets once the threshold is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[default]
    Free,
    Reduced,
}

/// How the shipping price is computed. Only flat rates exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    #[default]
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    /// Customer-facing label used when the rule has no campaign name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard Shipping",
            Self::Express => "Express Shipping",
        }
    }
}

/// A shipping threshold rule.
///
/// Synced to Shopify as a conditional delivery method definition in the
/// shop's default delivery profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRule {
    pub id: Option<RuleId>,
    pub enabled: bool,
    pub reward_type: RewardType,
    pub rate_type: RateType,
    /// Shipping price once the rule applies. Always zero for free shipping.
    pub amount: Decimal,
    /// Cart subtotal that unlocks the rate. `None` means no threshold.
    pub min_subtotal: Option<Decimal>,
    pub method: ShippingMethod,
    pub icon_choice: String,
    pub progress_text: ProgressText,
    pub campaign_name: String,
    pub cart_step_name: String,
    /// Delivery zone GID the method definition was created in.
    pub shopify_rate_id: Option<String>,
    /// Delivery method definition GID.
    pub shopify_method_definition_id: Option<String>,
}

const DEFAULT_ICON: &str = "truck";

impl ShippingRule {
    /// Whether `other` describes the same remote rate: amount, method and
    /// threshold. Used to find stale rates that were never given an id.
    #[must_use]
    pub fn same_rate(&self, other: &Self) -> bool {
        self.amount == other.amount
            && self.method == other.method
            && self.min_subtotal == other.min_subtotal
    }

    /// Name of the delivery method definition shown at checkout.
    #[must_use]
    pub fn rate_name(&self) -> String {
        if self.campaign_name.is_empty() {
            match self.reward_type {
                RewardType::Free => format!("Free {}", self.method.label()),
                RewardType::Reduced => self.method.label().to_string(),
            }
        } else {
            self.campaign_name.clone()
        }
    }
}

impl SectionRule for ShippingRule {
    const SECTION: Section = Section::Shipping;
    const NUMERIC_FIELDS: &'static [&'static str] = &["amount", "minSubtotal"];

    fn normalize(raw: &Value) -> Self {
        let reward_type = coerce::choice(
            coerce::field(raw, "rewardType"),
            &[("free", RewardType::Free), ("reduced", RewardType::Reduced)],
            RewardType::Free,
        );
        let amount = match reward_type {
            RewardType::Free => Decimal::ZERO,
            RewardType::Reduced => coerce::money(coerce::field(raw, "amount")).unwrap_or_default(),
        };
        let defaults = match reward_type {
            RewardType::Free => [
                "You're {{remaining}} away from free shipping",
                "You've unlocked free shipping!",
                "Free shipping on orders over {{threshold}}",
            ],
            RewardType::Reduced => [
                "You're {{remaining}} away from reduced shipping",
                "You've unlocked reduced shipping!",
                "Reduced shipping on orders over {{threshold}}",
            ],
        };

        Self {
            id: coerce::rule_id(coerce::field(raw, "id")),
            enabled: coerce::boolean(coerce::field(raw, "enabled"), true),
            reward_type,
            rate_type: RateType::Flat,
            amount,
            min_subtotal: coerce::money(coerce::field(raw, "minSubtotal")),
            method: coerce::choice(
                coerce::field(raw, "method"),
                &[
                    ("standard", ShippingMethod::Standard),
                    ("express", ShippingMethod::Express),
                ],
                ShippingMethod::Standard,
            ),
            icon_choice: coerce::opt_text(coerce::field(raw, "iconChoice"))
                .unwrap_or_else(|| DEFAULT_ICON.to_string()),
            progress_text: ProgressText::from_raw(raw, defaults),
            campaign_name: coerce::text(coerce::field(raw, "campaignName")),
            cart_step_name: coerce::text(coerce::field(raw, "cartStepName")),
            shopify_rate_id: coerce::opt_text(coerce::field(raw, "shopifyRateId")),
            shopify_method_definition_id: coerce::opt_text(coerce::field(
                raw,
                "shopifyMethodDefinitionId",
            )),
        }
    }

    fn validate(&self, index: usize, errors: &mut FieldErrors) {
        if self.amount.is_sign_negative() {
            errors.insert(index, "amount", "must be zero or greater");
        } else if self.reward_type == RewardType::Reduced && self.amount.is_zero() {
            errors.insert(index, "amount", "reduced rates need a price above zero");
        }
        if self.min_subtotal.is_some_and(|m| m.is_sign_negative()) {
            errors.insert(index, "minSubtotal", "must be zero or greater");
        }
    }

    fn id(&self) -> Option<RuleId> {
        self.id
    }

    fn set_id(&mut self, id: Option<RuleId>) {
        self.id = id;
    }

    fn remote_id(&self) -> Option<&str> {
        self.shopify_method_definition_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: Option<String>) {
        if remote_id.is_none() {
            self.shopify_rate_id = None;
        }
        self.shopify_method_definition_id = remote_id;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}
