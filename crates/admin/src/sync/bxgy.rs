//! Buy X Get Y offers as automatic BXGY discounts.

use smartcartify_core::rules::{BxgyScope, GiftType};
use smartcartify_core::{BxgyRule, SectionRule};
use tracing::instrument;

use super::{DiscountApi, SyncError, SyncReport, Syncable, Synchronizer, orphaned};
use crate::shopify::{BuysRequirement, BxgyDiscountInput, CombinesWith, DiscountItems};

fn buys_items(rule: &BxgyRule) -> DiscountItems {
    match rule.scope {
        BxgyScope::Collection => DiscountItems::Collections(rule.applies_to.collections.clone()),
        BxgyScope::Product | BxgyScope::Store => {
            DiscountItems::Products(rule.applies_to.products.clone())
        }
    }
}

fn bxgy_input(rule: &BxgyRule, sync_time: chrono::DateTime<chrono::Utc>) -> Result<BxgyDiscountInput, SyncError> {
    let gets_items = match rule.gift_type {
        GiftType::Same => buys_items(rule),
        GiftType::Specific => {
            let variant = rule
                .gift_sku
                .clone()
                .ok_or_else(|| SyncError::Incomplete("gift variant is not set".to_string()))?;
            DiscountItems::Variants(vec![variant])
        }
    };
    Ok(BxgyDiscountInput {
        title: rule.title(),
        buys: BuysRequirement::Quantity(rule.x_qty),
        buys_items: buys_items(rule),
        gets_quantity: rule.y_qty,
        gets_items,
        uses_per_order_limit: Some(rule.max_gifts),
        combines_with: CombinesWith {
            order_discounts: rule.allow_stacking,
            product_discounts: rule.allow_stacking,
            shipping_discounts: true,
        },
        starts_at: sync_time,
    })
}

impl<A: DiscountApi> Synchronizer<'_, A> {
    async fn sync_bxgy(&self, rule: &mut BxgyRule) -> Result<Option<String>, SyncError> {
        if !rule.enabled {
            return match rule.remote_id() {
                Some(id) => self.deactivate(id).await,
                None => Ok(None),
            };
        }

        if rule.scope == BxgyScope::Store {
            rule.applies_to.products = self.api.all_product_ids().await?;
            if rule.applies_to.products.is_empty() {
                return Err(SyncError::Incomplete("the store has no products".to_string()));
            }
        }

        if let Some(id) = rule.remote_id() {
            self.delete_discount_quietly(id).await?;
        }

        let mut input = bxgy_input(rule, self.now)?;
        input.title = self.unique_title(&input.title);
        let id = self
            .create_with_title_retry(&input.title, || self.api.create_bxgy_discount(&input))
            .await?;
        Ok(Some(id))
    }
}

impl Syncable for BxgyRule {
    #[instrument(skip_all, fields(section = "bxgy", count = rules.len()))]
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
            let outcome = sync.sync_bxgy(rule).await;
            if let Ok(remote_id) = &outcome {
                rule.set_remote_id(remote_id.clone());
            }
            report.record(index, outcome);
        }
        report
    }
}
