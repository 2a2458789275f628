//! Section and status enums.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unrecognized text for one of the enums in this module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Admin UI tab grouping a rule type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Shipping thresholds and rates.
    Shipping,
    /// Automatic and code discounts.
    #[serde(alias = "discounts")]
    Discount,
    /// Free gift rules.
    #[serde(alias = "free", alias = "freeGift", alias = "free-gift")]
    FreeGift,
    /// Buy X Get Y offers.
    #[serde(alias = "buyxgety")]
    Bxgy,
    /// Cart drawer presentation settings.
    #[serde(alias = "styles")]
    Style,
}

impl Section {
    /// All sections in admin tab order.
    pub const ALL: [Self; 5] = [
        Self::Shipping,
        Self::Discount,
        Self::FreeGift,
        Self::Bxgy,
        Self::Style,
    ];

    /// Stable name used in URLs, logs and lock keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Discount => "discount",
            Self::FreeGift => "free_gift",
            Self::Bxgy => "bxgy",
            Self::Style => "style",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipping" => Ok(Self::Shipping),
            "discount" | "discounts" => Ok(Self::Discount),
            "free_gift" | "free-gift" | "freeGift" | "free" => Ok(Self::FreeGift),
            "bxgy" | "buyxgety" => Ok(Self::Bxgy),
            "style" | "styles" => Ok(Self::Style),
            _ => Err(ParseEnumError::new("section", s)),
        }
    }
}

/// Billing plan status mirrored from Stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    #[default]
    Pending,
    Canceled,
    CancelAtPeriodEnd,
}

impl PlanStatus {
    /// Whether the shop can use paid features right now.
    ///
    /// A subscription scheduled to cancel stays usable until the period ends.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Active | Self::CancelAtPeriodEnd)
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Pending => "PENDING",
            Self::Canceled => "CANCELED",
            Self::CancelAtPeriodEnd => "CANCEL_AT_PERIOD_END",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "PENDING" => Ok(Self::Pending),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "CANCEL_AT_PERIOD_END" => Ok(Self::CancelAtPeriodEnd),
            _ => Err(ParseEnumError::new("plan status", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_aliases() {
        let s: Section = serde_json::from_str("\"freeGift\"").expect("alias");
        assert_eq!(s, Section::FreeGift);
        assert_eq!("discounts".parse::<Section>(), Ok(Section::Discount));
        let err = "coupons".parse::<Section>().expect_err("unknown section");
        assert_eq!(err.to_string(), "invalid section: coupons");
    }

    #[test]
    fn test_plan_status_roundtrip_text() {
        for status in [
            PlanStatus::Active,
            PlanStatus::Pending,
            PlanStatus::Canceled,
            PlanStatus::CancelAtPeriodEnd,
        ] {
            assert_eq!(status.as_str().parse::<PlanStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_plan_status_usable() {
        assert!(PlanStatus::CancelAtPeriodEnd.is_usable());
        assert!(!PlanStatus::Pending.is_usable());
    }
}
