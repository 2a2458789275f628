//! Core types for Smartcartify.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod gid;
pub mod id;
pub mod status;

pub use gid::{DiscountKind, ShopifyGid};
pub use id::*;
pub use status::*;
