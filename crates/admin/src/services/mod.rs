//! Business logic services for admin.
//!
//! # Services
//!
//! - `rules` - Rule save, removal and resync orchestration
//! - `merge` - Single-rule saves spliced into a stored section
//! - `locks` - Per shop and section save serialization
//! - `proxy` - Cached storefront payload for the app proxy
//! - `billing` - Plan polling after checkout

pub mod billing;
pub mod locks;
pub mod merge;
pub mod proxy;
pub mod rules;

pub use billing::await_active_plan;
pub use locks::SaveLocks;
pub use merge::merge_partial;
pub use proxy::{ProxyCache, StorefrontPayload};
pub use rules::{AllRules, RemoveTarget, RuleError, RuleService, SaveRequest, SaveResponse};
