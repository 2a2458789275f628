//! Buy X Get Y rules.

use serde::Serialize;
use serde_json::Value;

use super::{AppliesTo, FieldErrors, SectionRule, coerce};
use crate::types::{RuleId, Section};

/// Which purchases count toward "buy X".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BxgyScope {
    #[default]
    Product,
    Collection,
    /// Every product in the store. Synced with the full product id list.
    Store,
}

/// What the shopper gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftType {
    /// The same items that were bought.
    #[default]
    Same,
    /// A specific variant named by `gift_sku`.
    Specific,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BxgyRule {
    pub id: Option<RuleId>,
    pub enabled: bool,
    pub x_qty: u32,
    pub y_qty: u32,
    pub scope: BxgyScope,
    pub applies_to: AppliesTo,
    pub gift_type: GiftType,
    pub gift_sku: Option<String>,
    pub max_gifts: u32,
    pub allow_stacking: bool,
    pub campaign_name: String,
    pub buyxgety_id: Option<String>,
}

impl BxgyRule {
    /// Discount title, unique per shop on Shopify.
    #[must_use]
    pub fn title(&self) -> String {
        if self.campaign_name.is_empty() {
            format!("Buy {} Get {}", self.x_qty, self.y_qty)
        } else {
            self.campaign_name.clone()
        }
    }
}

impl SectionRule for BxgyRule {
    const SECTION: Section = Section::Bxgy;
    const NUMERIC_FIELDS: &'static [&'static str] = &["xQty", "yQty", "maxGifts"];

    fn normalize(raw: &Value) -> Self {
        let scope = coerce::choice(
            coerce::field(raw, "scope"),
            &[
                ("product", BxgyScope::Product),
                ("products", BxgyScope::Product),
                ("collection", BxgyScope::Collection),
                ("collections", BxgyScope::Collection),
                ("store", BxgyScope::Store),
                ("all", BxgyScope::Store),
            ],
            BxgyScope::Product,
        );
        let mut applies_to = AppliesTo::from_raw(raw);
        match scope {
            BxgyScope::Product | BxgyScope::Store => applies_to.collections.clear(),
            BxgyScope::Collection => applies_to.products.clear(),
        }
        let gift_type = coerce::choice(
            coerce::field(raw, "giftType"),
            &[("same", GiftType::Same), ("specific", GiftType::Specific)],
            GiftType::Same,
        );

        Self {
            id: coerce::rule_id(coerce::field(raw, "id")),
            enabled: coerce::boolean(coerce::field(raw, "enabled"), true),
            x_qty: coerce::count(coerce::field(raw, "xQty"), 1),
            y_qty: coerce::count(coerce::field(raw, "yQty"), 1),
            scope,
            applies_to,
            gift_type,
            gift_sku: match gift_type {
                GiftType::Specific => coerce::gid(coerce::field(raw, "giftSku"), "ProductVariant"),
                GiftType::Same => None,
            },
            max_gifts: coerce::count(coerce::field(raw, "maxGifts"), 1),
            allow_stacking: coerce::boolean(coerce::field(raw, "allowStacking"), false),
            campaign_name: coerce::text(coerce::field(raw, "campaignName")),
            buyxgety_id: coerce::opt_text(coerce::field(raw, "buyxgetyId")),
        }
    }

    fn validate(&self, index: usize, errors: &mut FieldErrors) {
        match self.scope {
            BxgyScope::Product if self.applies_to.products.is_empty() => {
                errors.insert(index, "appliesTo.products", "select at least one product");
            }
            BxgyScope::Collection if self.applies_to.collections.is_empty() => {
                errors.insert(index, "appliesTo.collections", "select at least one collection");
            }
            _ => {}
        }
        if self.gift_type == GiftType::Specific && self.gift_sku.is_none() {
            errors.insert(index, "giftSku", "select the gift variant");
        }
        for (field, value) in [
            ("xQty", self.x_qty),
            ("yQty", self.y_qty),
            ("maxGifts", self.max_gifts),
        ] {
            if value < 1 {
                errors.insert(index, field, "must be at least 1");
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
        self.buyxgety_id.as_deref()
    }

    fn set_remote_id(&mut self, remote_id: Option<String>) {
        self.buyxgety_id = remote_id;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}
