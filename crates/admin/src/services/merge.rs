//! Single-rule saves spliced into the stored section.
//!
//! The admin UI can save one row of a section table. The submitted rule
//! replaces the stored rule at its index (or is appended when the index is
//! one past the end) and the whole section is then saved as usual.

use smartcartify_core::FieldErrors;
use smartcartify_core::rules::{SectionRule, dedupe};

/// Splice `incoming` into `stored` at `index`.
///
/// When replacing, the stored row id and remote id carry over unless the
/// incoming rule names its own. Duplicates are dropped afterwards, keeping
/// the first occurrence.
///
/// # Errors
///
/// Returns a field error on `index` when it is past the end of the list.
pub fn merge_partial<R: SectionRule>(
    stored: Vec<R>,
    mut incoming: R,
    index: usize,
) -> Result<Vec<R>, FieldErrors> {
    let mut rules = stored;
    let len = rules.len();

    match rules.get_mut(index) {
        Some(existing) => {
            if incoming.id().is_none() {
                incoming.set_id(existing.id());
            }
            if incoming.remote_id().is_none() {
                incoming.set_remote_id(existing.remote_id().map(str::to_string));
            }
            *existing = incoming;
        }
        None if index == len => rules.push(incoming),
        None => {
            let mut errors = FieldErrors::default();
            errors.insert_global("index", format!("must be between 0 and {len}"));
            return Err(errors);
        }
    }

    Ok(dedupe(rules))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use smartcartify_core::{BxgyRule, DiscountRule, RuleId};
    use serde_json::json;

    fn discount(raw: serde_json::Value) -> DiscountRule {
        DiscountRule::normalize(&raw)
    }

    fn stored() -> Vec<DiscountRule> {
        vec![
            discount(json!({"id": 1, "value": 10, "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/1"})),
            discount(json!({"id": 2, "value": 20, "shopifyDiscountCodeId": "gid://shopify/DiscountAutomaticNode/2"})),
            discount(json!({"id": 3, "value": 30})),
        ]
    }

    #[test]
    fn test_replaces_only_target_index() {
        let before = stored();
        let merged = merge_partial(before.clone(), discount(json!({"value": 25})), 1).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], before[0]);
        assert_eq!(merged[2], before[2]);
        assert_eq!(merged[1].value, rust_decimal::Decimal::from(25));
        assert_eq!(merged[1].id, Some(RuleId::new(2)));
        assert_eq!(
            merged[1].shopify_discount_code_id.as_deref(),
            Some("gid://shopify/DiscountAutomaticNode/2")
        );
    }

    #[test]
    fn test_incoming_remote_id_wins() {
        let incoming = discount(json!({
            "value": 25,
            "shopifyDiscountCodeId": "gid://shopify/DiscountCodeNode/9"
        }));
        let merged = merge_partial(stored(), incoming, 0).unwrap();
        assert_eq!(
            merged[0].shopify_discount_code_id.as_deref(),
            Some("gid://shopify/DiscountCodeNode/9")
        );
    }

    #[test]
    fn test_index_at_end_appends() {
        let merged = merge_partial(stored(), discount(json!({"value": 40})), 3).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[3].id, None);
    }

    #[test]
    fn test_index_past_end_rejected() {
        let err = merge_partial(stored(), discount(json!({"value": 40})), 5).unwrap_err();
        assert_eq!(err.get("index"), Some("must be between 0 and 3"));
    }

    #[test]
    fn test_duplicate_of_earlier_rule_is_dropped() {
        let merged = merge_partial(stored(), discount(json!({"value": 10})), 2).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, Some(RuleId::new(1)));
    }

    #[test]
    fn test_first_rule_into_empty_section() {
        let incoming = BxgyRule::normalize(&json!({"scope": "store"}));
        let merged = merge_partial(Vec::new(), incoming.clone(), 0).unwrap();
        assert_eq!(merged, vec![incoming]);
    }
}
