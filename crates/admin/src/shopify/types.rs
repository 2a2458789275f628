//! Domain types for Shopify Admin API operations.
//!
//! These types describe what the synchronizer asks Shopify to do, separate
//! from the wire shapes in `admin::queries`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Discount Types
// =============================================================================

/// What a basic discount takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountValue {
    /// Fraction between 0 and 1.
    Percentage(Decimal),
    /// Fixed amount in shop currency.
    Amount(Decimal),
}

/// Items a discount targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiscountItems {
    /// Every product in the store.
    #[default]
    All,
    /// Product GIDs.
    Products(Vec<String>),
    /// Collection GIDs.
    Collections(Vec<String>),
    /// Product variant GIDs.
    Variants(Vec<String>),
}

/// Which other discount classes a discount combines with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombinesWith {
    pub order_discounts: bool,
    pub product_discounts: bool,
    pub shipping_discounts: bool,
}

/// Input for a code or automatic basic discount.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicDiscountInput {
    pub title: String,
    /// Redeem code. `None` creates an automatic discount.
    pub code: Option<String>,
    pub value: DiscountValue,
    pub items: DiscountItems,
    /// Minimum cart subtotal.
    pub min_subtotal: Option<Decimal>,
    pub combines_with: CombinesWith,
    pub starts_at: DateTime<Utc>,
}

/// Input for a code or automatic free shipping discount.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeShippingDiscountInput {
    pub title: String,
    pub code: Option<String>,
    pub min_subtotal: Option<Decimal>,
    pub combines_with: CombinesWith,
    pub starts_at: DateTime<Utc>,
}

/// What the customer must buy before a Buy X Get Y discount applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuysRequirement {
    /// Number of qualifying items.
    Quantity(u32),
    /// Amount spent on qualifying items, in shop currency.
    Subtotal(Decimal),
}

/// Input for an automatic Buy X Get Y discount.
#[derive(Debug, Clone, PartialEq)]
pub struct BxgyDiscountInput {
    pub title: String,
    pub buys: BuysRequirement,
    pub buys_items: DiscountItems,
    pub gets_quantity: u32,
    pub gets_items: DiscountItems,
    /// Times the offer may apply per order.
    pub uses_per_order_limit: Option<u32>,
    pub combines_with: CombinesWith,
    pub starts_at: DateTime<Utc>,
}

/// A discount node found by title search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountNode {
    /// `DiscountCodeNode` or `DiscountAutomaticNode` GID.
    pub id: String,
    pub title: String,
}

// =============================================================================
// Delivery Types
// =============================================================================

/// Zone in the default delivery profile where app rates are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub profile_id: String,
    pub location_group_id: String,
    pub zone_id: String,
}

/// Input for a flat rate delivery method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingRateInput {
    pub name: String,
    pub price: Decimal,
    pub currency_code: String,
    /// Rate only offered when the cart subtotal reaches this amount.
    pub min_subtotal: Option<Decimal>,
}

/// Format an amount the way Shopify money inputs expect (`"0.00"`).
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}
