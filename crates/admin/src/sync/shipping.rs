//! Shipping threshold rules as delivery method definitions.
//!
//! Rates live in the first zone of the shop's default delivery profile. A
//! disabled rule has its definition deleted, since method definitions cannot
//! be paused the way discounts can.

use smartcartify_core::{SectionRule, ShippingRule};
use tracing::{info, instrument};

use super::{DiscountApi, SyncError, SyncReport, Syncable, Synchronizer, orphaned};
use crate::shopify::{DeliveryZone, ShippingRateInput};

impl<A: DiscountApi> Synchronizer<'_, A> {
    async fn sync_rate(
        &self,
        zone: &DeliveryZone,
        currency: &str,
        rule: &mut ShippingRule,
    ) -> Result<Option<String>, SyncError> {
        if let Some(id) = rule.remote_id().map(str::to_string) {
            match self
                .api
                .delete_shipping_rates(zone, std::slice::from_ref(&id))
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_missing_object() => {
                    info!(id = %id, "Shipping rate already gone");
                }
                Err(e) => return Err(e.into()),
            }
            rule.set_remote_id(None);
        }

        if !rule.enabled {
            return Ok(None);
        }

        let input = ShippingRateInput {
            name: rule.rate_name(),
            price: rule.amount,
            currency_code: currency.to_string(),
            min_subtotal: rule.min_subtotal,
        };
        let id = self.api.create_shipping_rate(zone, &input).await?;
        rule.shopify_rate_id = Some(zone.zone_id.clone());
        Ok(Some(id))
    }
}

impl<A: DiscountApi> Synchronizer<'_, A> {
    async fn delete_stale_rates(
        &self,
        zone: &DeliveryZone,
        stale: &[String],
        report: &mut SyncReport,
    ) {
        if stale.is_empty() {
            return;
        }
        if let Err(e) = self.api.delete_shipping_rates(zone, stale).await {
            report.cleanup_failed(&e.into());
        }
    }
}

impl Syncable for ShippingRule {
    /// A submitted rule without a remote id takes over the definition of a
    /// stored rule with the same rate, so the old definition is replaced
    /// instead of left behind.
    fn adopt_remote_ids(previous: &[Self], next: &mut [Self]) {
        let mut taken: Vec<&str> = next.iter().filter_map(SectionRule::remote_id).collect();
        let mut adopted: Vec<(usize, String)> = Vec::new();

        for (index, rule) in next.iter().enumerate() {
            if rule.remote_id().is_some() {
                continue;
            }
            let candidate = previous.iter().find(|p| {
                p.remote_id().is_some_and(|id| !taken.contains(&id)) && p.same_rate(rule)
            });
            if let Some(id) = candidate.and_then(SectionRule::remote_id) {
                taken.push(id);
                adopted.push((index, id.to_string()));
            }
        }

        for (index, id) in adopted {
            if let Some(rule) = next.get_mut(index) {
                rule.set_remote_id(Some(id));
            }
        }
    }

    #[instrument(skip_all, fields(section = "shipping", count = rules.len()))]
    async fn sync<A: DiscountApi>(
        sync: &Synchronizer<'_, A>,
        rules: &mut [Self],
        removed: &[Self],
    ) -> SyncReport {
        let mut report = SyncReport::default();

        if !sync.shipping_enabled {
            info!("Shipping sync disabled, keeping rules local");
            for (index, rule) in rules.iter().enumerate() {
                report.record(index, Ok(rule.remote_id().map(str::to_string)));
            }
            return report;
        }

        let stale: Vec<String> = orphaned(removed, rules)
            .into_iter()
            .map(str::to_string)
            .collect();
        let needs_remote =
            !stale.is_empty() || rules.iter().any(|r| r.enabled || r.remote_id().is_some());
        if !needs_remote {
            return report;
        }

        let lookups = async {
            let zone = sync.api.default_delivery_zone().await?;
            let currency = sync.api.shop_currency().await?;
            Ok::<_, SyncError>((zone, currency))
        };
        let (zone, currency) = match lookups.await {
            Ok(found) => found,
            Err(e) => {
                let message = e.to_string();
                for (index, rule) in rules.iter().enumerate() {
                    if rule.enabled || rule.remote_id().is_some() {
                        report.record(index, Err(SyncError::Incomplete(message.clone())));
                    } else {
                        report.record(index, Ok(None));
                    }
                }
                report.cleanup_failed(&e);
                return report;
            }
        };

        sync.delete_stale_rates(&zone, &stale, &mut report).await;

        for (index, rule) in rules.iter_mut().enumerate() {
            let outcome = sync.sync_rate(&zone, &currency, rule).await;
            report.record(index, outcome);
        }
        report
    }

    #[instrument(skip_all, fields(section = "shipping", count = removed.len()))]
    async fn remove<A: DiscountApi>(
        sync: &Synchronizer<'_, A>,
        removed: &[Self],
        kept: &[Self],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let stale: Vec<String> = orphaned(removed, kept)
            .into_iter()
            .map(str::to_string)
            .collect();
        if !sync.shipping_enabled || stale.is_empty() {
            return report;
        }

        match sync.api.default_delivery_zone().await {
            Ok(zone) => sync.delete_stale_rates(&zone, &stale, &mut report).await,
            Err(e) => report.cleanup_failed(&e.into()),
        }
        report
    }
}
