//! Smartcartify Core - Shared rule types and normalization.
//!
//! This crate provides the types shared by the Smartcartify components:
//! - `admin` - Embedded admin API, rule persistence and Shopify synchronization
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Rule normalization and validation live here so they
//! can be exercised without a database or a Shopify store.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, Shopify GIDs, sections and billing status
//! - [`rules`] - Canonical rule shapes, the normalizer and validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod rules;
pub mod types;

pub use rules::{
    AppliesTo, BxgyRule, DiscountRule, FieldErrors, FreeGiftRule, ProgressText, SectionRule,
    ShippingRule, StyleSettings,
};
pub use types::*;
