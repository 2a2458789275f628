//! Lenient readers for loosely-typed form/row JSON.
//!
//! Admin forms post numbers as strings, booleans as `"on"`, and resource
//! picker selections as either GIDs, bare ids, or `{ "id": ... }` objects.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::types::{RuleId, ShopifyGid};

/// Field value, treating JSON `null` as absent.
pub fn field<'a>(raw: &'a Value, name: &str) -> Option<&'a Value> {
    raw.get(name).filter(|v| !v.is_null())
}

fn parse_decimal_str(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Read a decimal. Empty strings and unparseable input read as `None`.
pub fn decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => parse_decimal_str(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

/// Read a money amount rounded to cents with trailing zeros dropped, so
/// `"20"`, `20` and `"20.00"` all produce the same canonical value.
pub fn money(value: Option<&Value>) -> Option<Decimal> {
    decimal(value).map(|d| d.round_dp(2).normalize())
}

/// True when a value was supplied but is not a number.
pub fn is_invalid_number(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) if s.trim().is_empty() => false,
        Some(v @ (Value::Number(_) | Value::String(_))) => decimal(Some(v)).is_none(),
        Some(_) => true,
    }
}

/// Read a boolean flag with a default for missing values.
pub fn boolean(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => true,
            "false" | "0" | "off" | "no" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Read a trimmed string; numbers are stringified.
pub fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read a trimmed string, mapping empty to `None`.
pub fn opt_text(value: Option<&Value>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// Read a non-negative count, falling back to `default` when absent.
pub fn count(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64)),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(default)
}

/// Read a local row id.
pub fn rule_id(value: Option<&Value>) -> Option<RuleId> {
    let id = match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0).map(RuleId::new)
}

/// Read a resource reference and coerce it to a GID of `resource`.
pub fn gid(value: Option<&Value>, resource: &str) -> Option<String> {
    let raw = match value? {
        Value::Object(obj) => obj.get("id").map(|v| text(Some(v)))?,
        other => text(Some(other)),
    };
    ShopifyGid::coerce(&raw, resource)
}

/// Read a list of resource references as GIDs, dropping invalid entries
/// and duplicates while preserving order.
pub fn gid_list(value: Option<&Value>, resource: &str) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| gid(Some(item), resource))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Read an enum by case-insensitive name lookup.
pub fn choice<T: Copy>(value: Option<&Value>, table: &[(&str, T)], default: T) -> T {
    let name = text(value).to_ascii_lowercase();
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map_or(default, |(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_money_canonicalizes_scale() {
        let a = money(Some(&json!("20.00")));
        let b = money(Some(&json!(20)));
        assert_eq!(a, b);
        assert_eq!(a.map(|d| d.to_string()).as_deref(), Some("20"));
    }

    #[test]
    fn test_decimal_handles_currency_and_separators() {
        assert_eq!(
            decimal(Some(&json!("$2,000.50"))),
            Decimal::from_str("2000.50").ok()
        );
        assert_eq!(decimal(Some(&json!(""))), None);
    }

    #[test]
    fn test_invalid_number_detection() {
        assert!(is_invalid_number(Some(&json!("abc"))));
        assert!(is_invalid_number(Some(&json!(true))));
        assert!(!is_invalid_number(Some(&json!(""))));
        assert!(!is_invalid_number(Some(&json!("12.5"))));
        assert!(!is_invalid_number(None));
    }

    #[test]
    fn test_boolean_form_values() {
        assert!(boolean(Some(&json!("on")), false));
        assert!(!boolean(Some(&json!("false")), true));
        assert!(boolean(None, true));
    }

    #[test]
    fn test_count_defaults() {
        assert_eq!(count(None, 1), 1);
        assert_eq!(count(Some(&json!("3")), 1), 3);
        assert_eq!(count(Some(&json!(2.9)), 1), 2);
        assert_eq!(count(Some(&json!("x")), 1), 1);
    }

    #[test]
    fn test_gid_list_dedupes_and_coerces() {
        let ids = gid_list(
            Some(&json!(["1", {"id": "gid://shopify/Product/2"}, 1, "bad"])),
            "Product",
        );
        assert_eq!(
            ids,
            vec![
                "gid://shopify/Product/1".to_string(),
                "gid://shopify/Product/2".to_string()
            ]
        );
    }

    #[test]
    fn test_rule_id_rejects_non_positive() {
        assert_eq!(rule_id(Some(&json!(0))), None);
        assert_eq!(rule_id(Some(&json!("12"))), Some(RuleId::new(12)));
    }
}
