//! Remote discount synchronizer.
//!
//! Maps canonical rules onto Shopify discounts and delivery method
//! definitions. Each section is synced rule by rule:
//!
//! - a disabled rule with a remote object is deactivated (shipping rates
//!   are deleted instead) and never recreated
//! - an enabled rule deletes its old remote object, then creates a new one
//! - errors are recorded per rule and the batch continues
//!
//! Shopify calls go through the [`DiscountApi`] trait so the flows can be
//! exercised against an in-memory fake.

mod bxgy;
mod discounts;
mod free_gifts;
mod shipping;

#[cfg(test)]
pub(crate) mod fake;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use smartcartify_core::SectionRule;
use thiserror::Error;
use tracing::{info, warn};

use crate::shopify::{
    AdminShopifyError, BasicDiscountInput, BxgyDiscountInput, DeliveryZone, DiscountNode,
    FreeShippingDiscountInput, ShippingRateInput, ShopClient,
};

/// Shopify operations the synchronizer depends on.
pub trait DiscountApi: Send + Sync {
    fn create_basic_discount(
        &self,
        input: &BasicDiscountInput,
    ) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn create_free_shipping_discount(
        &self,
        input: &FreeShippingDiscountInput,
    ) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn create_bxgy_discount(
        &self,
        input: &BxgyDiscountInput,
    ) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn set_discount_active(
        &self,
        id: &str,
        active: bool,
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    fn delete_discount(&self, id: &str)
    -> impl Future<Output = Result<(), AdminShopifyError>> + Send;

    fn find_discounts_by_title(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Vec<DiscountNode>, AdminShopifyError>> + Send;

    fn shop_currency(&self) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn all_product_ids(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, AdminShopifyError>> + Send;

    fn resolve_gift_variant(
        &self,
        gid: &str,
    ) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn default_delivery_zone(
        &self,
    ) -> impl Future<Output = Result<DeliveryZone, AdminShopifyError>> + Send;

    fn create_shipping_rate(
        &self,
        zone: &DeliveryZone,
        input: &ShippingRateInput,
    ) -> impl Future<Output = Result<String, AdminShopifyError>> + Send;

    fn delete_shipping_rates(
        &self,
        zone: &DeliveryZone,
        definition_ids: &[String],
    ) -> impl Future<Output = Result<(), AdminShopifyError>> + Send;
}

impl DiscountApi for ShopClient {
    async fn create_basic_discount(
        &self,
        input: &BasicDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        Self::create_basic_discount(self, input).await
    }

    async fn create_free_shipping_discount(
        &self,
        input: &FreeShippingDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        Self::create_free_shipping_discount(self, input).await
    }

    async fn create_bxgy_discount(
        &self,
        input: &BxgyDiscountInput,
    ) -> Result<String, AdminShopifyError> {
        Self::create_bxgy_discount(self, input).await
    }

    async fn set_discount_active(&self, id: &str, active: bool) -> Result<(), AdminShopifyError> {
        Self::set_discount_active(self, id, active).await
    }

    async fn delete_discount(&self, id: &str) -> Result<(), AdminShopifyError> {
        Self::delete_discount(self, id).await
    }

    async fn find_discounts_by_title(
        &self,
        title: &str,
    ) -> Result<Vec<DiscountNode>, AdminShopifyError> {
        Self::find_discounts_by_title(self, title).await
    }

    async fn shop_currency(&self) -> Result<String, AdminShopifyError> {
        Self::shop_currency(self).await
    }

    async fn all_product_ids(&self) -> Result<Vec<String>, AdminShopifyError> {
        Ok(Self::all_product_ids(self).await?.as_ref().clone())
    }

    async fn resolve_gift_variant(&self, gid: &str) -> Result<String, AdminShopifyError> {
        Self::resolve_gift_variant(self, gid).await
    }

    async fn default_delivery_zone(&self) -> Result<DeliveryZone, AdminShopifyError> {
        Self::default_delivery_zone(self).await
    }

    async fn create_shipping_rate(
        &self,
        zone: &DeliveryZone,
        input: &ShippingRateInput,
    ) -> Result<String, AdminShopifyError> {
        Self::create_shipping_rate(self, zone, input).await
    }

    async fn delete_shipping_rates(
        &self,
        zone: &DeliveryZone,
        definition_ids: &[String],
    ) -> Result<(), AdminShopifyError> {
        Self::delete_shipping_rates(self, zone, definition_ids).await
    }
}

// =============================================================================
// Errors and reports
// =============================================================================

/// Failure syncing one rule.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    /// Title stayed taken after deleting the colliding discounts.
    #[error("discount title '{0}' is still in use after removing duplicates")]
    TitleCollision(String),

    /// Rule is missing something the remote object needs.
    #[error("{0}")]
    Incomplete(String),
}

/// Outcome for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSyncResult {
    pub index: usize,
    /// Remote id after sync, if the rule has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-rule outcomes for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub results: Vec<RuleSyncResult>,
    /// Errors not tied to one submitted rule (stale remote cleanup).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleanup_errors: Vec<String>,
}

impl SyncReport {
    fn record(&mut self, index: usize, outcome: Result<Option<String>, SyncError>) {
        let result = match outcome {
            Ok(id) => RuleSyncResult {
                index,
                id,
                error: None,
            },
            Err(e) => {
                warn!(index, error = %e, "Rule sync failed");
                RuleSyncResult {
                    index,
                    id: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.results.push(result);
    }

    fn cleanup_failed(&mut self, error: &SyncError) {
        warn!(error = %error, "Stale remote cleanup failed");
        self.cleanup_errors.push(error.to_string());
    }

    /// Whether every rule synced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.cleanup_errors.is_empty() && self.results.iter().all(|r| r.error.is_none())
    }

    /// All errors in one message, `None` when everything synced.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let messages: Vec<String> = self
            .results
            .iter()
            .filter_map(|r| {
                r.error
                    .as_ref()
                    .map(|e| format!("Rule {}: {e}", r.index + 1))
            })
            .chain(self.cleanup_errors.iter().cloned())
            .collect();
        (!messages.is_empty()).then(|| messages.join("; "))
    }
}

// =============================================================================
// Synchronizer
// =============================================================================

/// Syncs rule sections for one shop.
///
/// One synchronizer serves one save. Remote ids the batch owns or creates are
/// claimed, and title collision cleanup never deletes a claimed id.
pub struct Synchronizer<'a, A> {
    api: &'a A,
    shipping_enabled: bool,
    now: DateTime<Utc>,
    claimed: Mutex<HashSet<String>>,
    titles: Mutex<HashMap<String, u32>>,
}

impl<'a, A: DiscountApi> Synchronizer<'a, A> {
    #[must_use]
    pub fn new(api: &'a A, shipping_enabled: bool) -> Self {
        Self {
            api,
            shipping_enabled,
            now: Utc::now(),
            claimed: Mutex::new(HashSet::new()),
            titles: Mutex::new(HashMap::new()),
        }
    }

    /// Mark remote ids as owned by this batch.
    fn claim<'r>(&self, ids: impl IntoIterator<Item = &'r str>) {
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.extend(ids.into_iter().map(str::to_string));
        }
    }

    /// Claim the remote objects disabled rules keep while deactivated.
    fn claim_disabled<R: SectionRule>(&self, rules: &[R]) {
        self.claim(
            rules
                .iter()
                .filter(|r| !r.enabled())
                .filter_map(SectionRule::remote_id),
        );
    }

    fn is_claimed(&self, id: &str) -> bool {
        self.claimed.lock().is_ok_and(|claimed| claimed.contains(id))
    }

    /// `base` the first time it is asked for in this batch, then
    /// `base (2)`, `base (3)` and so on.
    fn unique_title(&self, base: &str) -> String {
        let Ok(mut titles) = self.titles.lock() else {
            return base.to_string();
        };
        let seen = titles.entry(base.to_string()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            base.to_string()
        } else {
            format!("{base} ({seen})")
        }
    }

    /// Delete a discount, treating "already gone" as success.
    async fn delete_discount_quietly(&self, id: &str) -> Result<(), SyncError> {
        match self.api.delete_discount(id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_missing_object() => {
                info!(id = %id, "Remote discount already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deactivate a disabled rule's discount.
    ///
    /// Returns the id to keep: `None` when the discount no longer exists.
    async fn deactivate(&self, id: &str) -> Result<Option<String>, SyncError> {
        match self.api.set_discount_active(id, false).await {
            Ok(()) => Ok(Some(id.to_string())),
            Err(e) if e.is_missing_object() => {
                info!(id = %id, "Disabled rule's discount already gone");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run a create call, clearing a title collision once.
    ///
    /// On "must be unique", discounts with exactly this title are deleted,
    /// except ids this batch owns, and the create is retried one time. The
    /// created id is claimed.
    async fn create_with_title_retry<F, Fut>(&self, title: &str, create: F) -> Result<String, SyncError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<String, AdminShopifyError>>,
    {
        let id = match create().await {
            Ok(id) => id,
            Err(e) if e.is_title_collision() => {
                info!(title = %title, "Discount title taken, removing duplicates");
                for node in self.api.find_discounts_by_title(title).await? {
                    if self.is_claimed(&node.id) {
                        warn!(id = %node.id, title = %title, "Title held by this batch, not deleting");
                        continue;
                    }
                    self.delete_discount_quietly(&node.id).await?;
                }
                match create().await {
                    Ok(id) => id,
                    Err(e) if e.is_title_collision() => {
                        return Err(SyncError::TitleCollision(title.to_string()));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };
        self.claim([id.as_str()]);
        Ok(id)
    }

    /// Remove remote discounts of rules whose rows were deleted.
    async fn remove_discounts<'r>(
        &self,
        remote_ids: impl IntoIterator<Item = &'r str>,
        report: &mut SyncReport,
    ) {
        for id in remote_ids {
            if let Err(e) = self.delete_discount_quietly(id).await {
                report.cleanup_failed(&e);
            }
        }
    }
}

/// Remote ids of `removed` rules that no kept rule still points at.
fn orphaned<'r, R: SectionRule>(removed: &'r [R], kept: &[R]) -> Vec<&'r str> {
    removed
        .iter()
        .filter_map(SectionRule::remote_id)
        .filter(|id| !kept.iter().any(|k| k.remote_id() == Some(*id)))
        .collect()
}

/// A rule type the synchronizer knows how to push to Shopify.
pub trait Syncable: SectionRule {
    /// Give submitted rules the remote ids of stored rules they replace.
    /// Runs before persisting.
    fn adopt_remote_ids(_previous: &[Self], _next: &mut [Self]) {}

    /// Sync `rules` in place, writing remote ids back into them, and remove
    /// the remote objects of `removed` rules.
    fn sync<A: DiscountApi>(
        sync: &Synchronizer<'_, A>,
        rules: &mut [Self],
        removed: &[Self],
    ) -> impl Future<Output = SyncReport> + Send;

    /// Remove the remote objects of `removed` rules without touching the
    /// `kept` ones.
    fn remove<A: DiscountApi>(
        sync: &Synchronizer<'_, A>,
        removed: &[Self],
        kept: &[Self],
    ) -> impl Future<Output = SyncReport> + Send {
        async move {
            let mut report = SyncReport::default();
            sync.remove_discounts(orphaned(removed, kept), &mut report)
                .await;
            report
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_joins_failures() {
        let mut report = SyncReport::default();
        report.record(0, Ok(Some("gid://shopify/DiscountAutomaticNode/1".to_string())));
        report.record(1, Err(SyncError::Incomplete("gift variant missing".to_string())));
        report.cleanup_failed(&SyncError::Incomplete("stale rate".to_string()));

        assert!(!report.is_ok());
        assert_eq!(
            report.error_message().as_deref(),
            Some("Rule 2: gift variant missing; stale rate")
        );
    }

    #[test]
    fn test_clean_report_has_no_message() {
        let mut report = SyncReport::default();
        report.record(0, Ok(None));
        assert!(report.is_ok());
        assert!(report.error_message().is_none());
    }
}
