//! Free gift rules.
//!
//! A `min_amount` gift becomes an automatic Buy X Get Y discount: spending the
//! threshold on qualifying products gets `qty` of the gift variant free, up to
//! `limit` times per order. Online-payment gifts are applied by the storefront
//! script and have no remote object.

use smartcartify_core::rules::GiftTrigger;
use smartcartify_core::{FreeGiftRule, SectionRule};
use tracing::instrument;

use super::{DiscountApi, SyncError, SyncReport, Syncable, Synchronizer, orphaned};
use crate::shopify::{
    BuysRequirement, BxgyDiscountInput, CombinesWith, DiscountItems, format_money,
};

fn gift_title(rule: &FreeGiftRule) -> String {
    rule.min_purchase.map_or_else(
        || "Free gift".to_string(),
        |min| format!("Free gift over {}", format_money(min)),
    )
}

fn gift_input(
    rule: &FreeGiftRule,
    qualifying: Vec<String>,
    variant: String,
    sync_time: chrono::DateTime<chrono::Utc>,
) -> Result<BxgyDiscountInput, SyncError> {
    let threshold = rule
        .min_purchase
        .ok_or_else(|| SyncError::Incomplete("minimum purchase is not set".to_string()))?;
    Ok(BxgyDiscountInput {
        title: gift_title(rule),
        buys: BuysRequirement::Subtotal(threshold),
        buys_items: DiscountItems::Products(qualifying),
        gets_quantity: rule.qty,
        gets_items: DiscountItems::Variants(vec![variant]),
        uses_per_order_limit: Some(rule.limit),
        combines_with: CombinesWith {
            order_discounts: true,
            product_discounts: false,
            shipping_discounts: true,
        },
        starts_at: sync_time,
    })
}

impl<A: DiscountApi> Synchronizer<'_, A> {
    async fn sync_free_gift(&self, rule: &FreeGiftRule) -> Result<Option<String>, SyncError> {
        if rule.trigger == GiftTrigger::PaymentOnline {
            // Storefront-only; drop any discount left from a previous trigger
            if let Some(id) = rule.remote_id() {
                self.delete_discount_quietly(id).await?;
            }
            return Ok(None);
        }

        if !rule.enabled {
            return match rule.remote_id() {
                Some(id) => self.deactivate(id).await,
                None => Ok(None),
            };
        }

        let bonus = rule
            .bonus
            .as_deref()
            .ok_or_else(|| SyncError::Incomplete("gift product is not set".to_string()))?;
        let variant = self.api.resolve_gift_variant(bonus).await?;

        let qualifying = if rule.all_product_ids.is_empty() {
            self.api.all_product_ids().await?
        } else {
            rule.all_product_ids.clone()
        };
        if qualifying.is_empty() {
            return Err(SyncError::Incomplete("the store has no products".to_string()));
        }

        if let Some(id) = rule.remote_id() {
            self.delete_discount_quietly(id).await?;
        }

        let mut input = gift_input(rule, qualifying, variant, self.now)?;
        input.title = self.unique_title(&input.title);
        let id = self
            .create_with_title_retry(&input.title, || self.api.create_bxgy_discount(&input))
            .await?;
        Ok(Some(id))
    }
}

impl Syncable for FreeGiftRule {
    #[instrument(skip_all, fields(section = "free_gift", count = rules.len()))]
    async fn sync<A: DiscountApi>(
        sync: &Synchronizer<'_, A>,
        rules: &mut [Self],
        removed: &[Self],
    ) -> SyncReport {
        let mut report = SyncReport::default();

        sync.remove_discounts(orphaned(removed, rules), &mut report)
            .await;
        sync.claim_disabled(rules);

        for (index, rule) in rules.iter_mut().enumerate() {
            let outcome = sync.sync_free_gift(rule).await;
            if let Ok(remote_id) = &outcome {
                rule.set_remote_id(remote_id.clone());
            }
            report.record(index, outcome);
        }
        report
    }
}
