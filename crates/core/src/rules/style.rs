//! Cart drawer style settings.

use serde::Serialize;
use serde_json::{Map, Value};

const DEFAULTS: &[(&str, &str)] = &[
    ("primaryColor", "#111111"),
    ("accentColor", "#16a34a"),
    ("progressBarColor", "#16a34a"),
    ("fontFamily", "inherit"),
    ("drawerPosition", "right"),
];

/// Presentation settings for the storefront cart drawer.
///
/// A free-form document; known keys get defaults, unknown keys pass through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StyleSettings(Map<String, Value>);

impl StyleSettings {
    /// Build settings from a submitted or stored document. Non-object input
    /// yields the defaults.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Self {
        let mut settings = match raw {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        settings.retain(|_, v| !v.is_null());
        for (key, default) in DEFAULTS {
            settings
                .entry(*key)
                .or_insert_with(|| Value::String((*default).to_string()));
        }
        Self(settings)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self::from_raw(&Value::Null)
    }
}
