//! Automatic and code discounts.

use rust_decimal::Decimal;
use smartcartify_core::rules::{DiscountScope, DiscountType, ValueType};
use smartcartify_core::{DiscountRule, SectionRule};
use tracing::instrument;

use super::{DiscountApi, SyncError, SyncReport, Syncable, Synchronizer, orphaned};
use crate::shopify::{
    BasicDiscountInput, CombinesWith, DiscountItems, DiscountValue, FreeShippingDiscountInput,
};

/// Title shown in the Shopify discounts list.
pub(super) fn title(rule: &DiscountRule) -> String {
    if !rule.campaign_name.is_empty() {
        return rule.campaign_name.clone();
    }
    match (rule.discount_type, rule.value_type) {
        (DiscountType::Code, _) => rule.discount_code.clone(),
        (DiscountType::Automatic, ValueType::FreeShipping) => "Free shipping".to_string(),
        (DiscountType::Automatic, _) => format!("{} off", rule.display_value),
    }
}

fn code(rule: &DiscountRule) -> Option<String> {
    (rule.discount_type == DiscountType::Code).then(|| rule.discount_code.clone())
}

fn items(rule: &DiscountRule) -> DiscountItems {
    match rule.scope {
        DiscountScope::All => DiscountItems::All,
        DiscountScope::Products => DiscountItems::Products(rule.applies_to.products.clone()),
        DiscountScope::Collections => {
            DiscountItems::Collections(rule.applies_to.collections.clone())
        }
    }
}

fn basic_input(rule: &DiscountRule, sync_time: chrono::DateTime<chrono::Utc>) -> BasicDiscountInput {
    let value = match rule.value_type {
        ValueType::Amount => DiscountValue::Amount(rule.value),
        _ => DiscountValue::Percentage(rule.value / Decimal::ONE_HUNDRED),
    };
    BasicDiscountInput {
        title: title(rule),
        code: code(rule),
        value,
        items: items(rule),
        min_subtotal: rule.min_purchase,
        combines_with: CombinesWith {
            shipping_discounts: true,
            ..CombinesWith::default()
        },
        starts_at: sync_time,
    }
}

fn free_shipping_input(
    rule: &DiscountRule,
    sync_time: chrono::DateTime<chrono::Utc>,
) -> FreeShippingDiscountInput {
    FreeShippingDiscountInput {
        title: title(rule),
        code: code(rule),
        min_subtotal: rule.min_purchase,
        combines_with: CombinesWith {
            order_discounts: true,
            product_discounts: true,
            shipping_discounts: false,
        },
        starts_at: sync_time,
    }
}

impl<A: DiscountApi> Synchronizer<'_, A> {
    async fn sync_discount(&self, rule: &DiscountRule) -> Result<Option<String>, SyncError> {
        if !rule.enabled {
            return match rule.remote_id() {
                Some(id) => self.deactivate(id).await,
                None => Ok(None),
            };
        }

        if let Some(id) = rule.remote_id() {
            self.delete_discount_quietly(id).await?;
        }

        let id = if rule.value_type == ValueType::FreeShipping {
            let mut input = free_shipping_input(rule, self.now);
            input.title = self.unique_title(&input.title);
            self.create_with_title_retry(&input.title, || {
                self.api.create_free_shipping_discount(&input)
            })
            .await?
        } else {
            let mut input = basic_input(rule, self.now);
            input.title = self.unique_title(&input.title);
            self.create_with_title_retry(&input.title, || self.api.create_basic_discount(&input))
                .await?
        };
        Ok(Some(id))
    }
}

impl Syncable for DiscountRule {
    #[instrument(skip_all, fields(section = "discount", count = rules.len()))]
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
            let outcome = sync.sync_discount(rule).await;
            if let Ok(remote_id) = &outcome {
                rule.set_remote_id(remote_id.clone());
            }
            report.record(index, outcome);
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::sync::fake::{Call, FakeApi};
    use serde_json::json;

    fn rule(raw: serde_json::Value) -> DiscountRule {
        DiscountRule::normalize(&raw)
    }

    #[test]
    fn test_titles() {
        assert_eq!(title(&rule(json!({"type": "code", "discountCode": "SAVE10"}))), "SAVE10");
        assert_eq!(title(&rule(json!({"valueType": "percent", "value": 15}))), "15% off");
        assert_eq!(title(&rule(json!({"valueType": "free_shipping"}))), "Free shipping");
        assert_eq!(
            title(&rule(json!({"campaignName": "Summer", "value": 15}))),
            "Summer"
        );
    }

    #[test]
    fn test_percent_becomes_fraction() {
        let input = basic_input(&rule(json!({"value": 15})), chrono::Utc::now());
        assert_eq!(input.value, DiscountValue::Percentage(Decimal::new(15, 2)));
        assert_eq!(input.code, None);
    }

    #[tokio::test]
    async fn test_code_discount_created_with_code() {
        let api = FakeApi::default();
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![rule(json!({"type": "code", "discountCode": "SAVE10", "value": 10}))];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;

        assert!(report.is_ok());
        let remote = rules[0].shopify_discount_code_id.clone().unwrap();
        assert!(remote.starts_with("gid://shopify/DiscountCodeNode/"));
        assert_eq!(api.created_basic()[0].code.as_deref(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn test_disable_then_reenable() {
        let api = FakeApi::default();
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![rule(json!({"value": 10}))];
        DiscountRule::sync(&sync, &mut rules, &[]).await;
        let first = rules[0].shopify_discount_code_id.clone().unwrap();

        // Disabling deactivates and keeps the id without creating anything
        rules[0].enabled = false;
        api.clear_calls();
        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;
        assert!(report.is_ok());
        assert_eq!(api.calls(), vec![Call::SetActive(first.clone(), false)]);
        assert_eq!(rules[0].shopify_discount_code_id.as_deref(), Some(first.as_str()));

        // Re-enabling replaces the old discount with exactly one new one
        rules[0].enabled = true;
        api.clear_calls();
        DiscountRule::sync(&sync, &mut rules, &[]).await;
        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], Call::Delete(first.clone()));
        assert!(matches!(calls[1], Call::CreateBasic(_)));
        assert_ne!(rules[0].shopify_discount_code_id.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn test_disabled_rule_without_remote_does_nothing() {
        let api = FakeApi::default();
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![rule(json!({"enabled": false, "value": 10}))];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;
        assert!(report.is_ok());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_remote_on_delete_is_ignored() {
        let api = FakeApi::default();
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![rule(json!({
            "value": 10,
            "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/404"
        }))];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;
        assert!(report.is_ok());
        assert!(rules[0].shopify_discount_code_id.is_some());
    }

    #[tokio::test]
    async fn test_title_collision_retried_once() {
        let api = FakeApi::default();
        api.seed_discount("gid://shopify/DiscountAutomaticNode/900", "Summer");
        api.fail_title_once("Summer");
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![rule(json!({"campaignName": "Summer", "value": 20}))];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;

        assert!(report.is_ok());
        let calls = api.calls();
        assert!(calls.contains(&Call::FindByTitle("Summer".to_string())));
        assert!(calls.contains(&Call::Delete(
            "gid://shopify/DiscountAutomaticNode/900".to_string()
        )));
        assert_eq!(api.created_basic().len(), 2);
    }

    #[tokio::test]
    async fn test_second_title_collision_is_error() {
        let api = FakeApi::default();
        api.fail_title_always("Summer");
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![
            rule(json!({"campaignName": "Summer", "value": 20})),
            rule(json!({"campaignName": "Winter", "value": 5})),
        ];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;

        assert_eq!(
            report.results[0].error.as_deref(),
            Some("discount title 'Summer' is still in use after removing duplicates")
        );
        // The batch continues past the failed rule
        assert!(report.results[1].error.is_none());
        assert!(rules[1].shopify_discount_code_id.is_some());
        assert!(rules[0].shopify_discount_code_id.is_none());
    }

    #[tokio::test]
    async fn test_same_title_rules_keep_their_own_discounts() {
        let api = FakeApi::default();
        api.reject_live_titles();
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![
            rule(json!({"value": 10, "minPurchase": 50})),
            rule(json!({"value": 10, "minPurchase": 100})),
        ];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;

        assert!(report.is_ok());
        let first = rules[0].shopify_discount_code_id.clone().unwrap();
        let second = rules[1].shopify_discount_code_id.clone().unwrap();
        assert_ne!(first, second);
        assert_eq!(api.live_discounts(), vec![first, second]);
        let titles: Vec<String> = api.created_basic().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["10% off".to_string(), "10% off (2)".to_string()]);
    }

    #[tokio::test]
    async fn test_collision_cleanup_spares_batch_discounts() {
        let api = FakeApi::default();
        api.reject_live_titles();
        // Disabled rule keeps its deactivated discount titled "Summer"
        api.seed_discount("gid://shopify/DiscountAutomaticNode/50", "Summer");
        let sync = Synchronizer::new(&api, false);
        let mut rules = vec![
            rule(json!({"campaignName": "Summer", "value": 20})),
            rule(json!({
                "campaignName": "Summer",
                "value": 5,
                "enabled": false,
                "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/50"
            })),
        ];

        let report = DiscountRule::sync(&sync, &mut rules, &[]).await;

        assert_eq!(
            report.results[0].error.as_deref(),
            Some("discount title 'Summer' is still in use after removing duplicates")
        );
        assert!(
            !api.calls()
                .contains(&Call::Delete("gid://shopify/DiscountAutomaticNode/50".to_string()))
        );
        assert_eq!(
            rules[1].shopify_discount_code_id.as_deref(),
            Some("gid://shopify/DiscountAutomaticNode/50")
        );
    }

    #[tokio::test]
    async fn test_removed_rules_delete_remote() {
        let api = FakeApi::default();
        let sync = Synchronizer::new(&api, false);
        let removed = vec![rule(json!({
            "value": 10,
            "shopifyDiscountCodeId": "gid://shopify/DiscountCodeNode/7"
        }))];

        let report = DiscountRule::sync(&sync, &mut [], &removed).await;
        assert!(report.is_ok());
        assert_eq!(
            api.calls(),
            vec![Call::Delete("gid://shopify/DiscountCodeNode/7".to_string())]
        );
    }

    #[tokio::test]
    async fn test_remove_deletes_only_removed_remote() {
        let api = FakeApi::default();
        api.seed_discount("gid://shopify/DiscountAutomaticNode/1", "10% off");
        api.seed_discount("gid://shopify/DiscountAutomaticNode/2", "20% off");
        let sync = Synchronizer::new(&api, false);
        let removed = vec![rule(json!({
            "value": 10,
            "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/1"
        }))];
        let kept = vec![rule(json!({
            "value": 20,
            "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/2"
        }))];

        let report = DiscountRule::remove(&sync, &removed, &kept).await;

        assert!(report.is_ok());
        assert_eq!(
            api.live_discounts(),
            vec!["gid://shopify/DiscountAutomaticNode/2".to_string()]
        );
    }
}
