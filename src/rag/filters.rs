//! Caller-supplied retrieval constraints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::ConstraintMap;

/// Keys that carry the result-count hint rather than a metadata constraint.
const RESULT_COUNT_KEYS: [&str; 2] = ["num_embeds", "num_results"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    /// Result-count hint from the client. The extracted intent decides the
    /// actual count; this is never forwarded to the index.
    #[serde(
        rename = "num_embeds",
        alias = "num_results",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub num_results: Option<u64>,
    /// Equality constraints over record attributes, e.g. `termDescription`
    /// or `catalogSubject`.
    #[serde(flatten)]
    pub constraints: ConstraintMap,
}

impl Filters {
    pub fn with_constraint(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.insert(key.into(), value.into());
        self
    }

    /// Active constraints only: result-count keys and inactive values removed.
    pub fn clean(&self) -> ConstraintMap {
        self.constraints
            .iter()
            .filter(|(key, _)| !RESULT_COUNT_KEYS.contains(&key.as_str()))
            .filter(|(_, value)| is_active(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// `null`, `""`, `0`, `false`, `[]` and `{}` do not constrain anything.
fn is_active(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_drops_count_and_inactive_fields() {
        let filters: Filters = serde_json::from_value(json!({
            "num_embeds": 5,
            "termDescription": "Fall 2024",
            "catalogSubject": "",
            "classMinUnits": 0,
            "consent": null,
            "quantitativeReasoning": false,
            "meetings": [],
            "extra": {}
        }))
        .unwrap();

        let clean = filters.clean();

        assert_eq!(filters.num_results, Some(5));
        assert_eq!(clean.len(), 1);
        assert_eq!(clean["termDescription"], "Fall 2024");
    }

    #[test]
    fn alias_is_accepted_and_never_forwarded() {
        let filters: Filters = serde_json::from_value(json!({
            "num_results": 7,
            "catalogSubject": "STAT"
        }))
        .unwrap();

        let clean = filters.clean();

        assert_eq!(filters.num_results, Some(7));
        assert!(!clean.contains_key("num_results"));
        assert!(!clean.contains_key("num_embeds"));
        assert_eq!(clean["catalogSubject"], "STAT");
    }

    #[test]
    fn empty_filters_are_unconstrained() {
        let filters: Filters = serde_json::from_value(json!({})).unwrap();
        assert!(filters.clean().is_empty());
        assert!(Filters::default().clean().is_empty());
    }

    #[test]
    fn builder_and_serialization_use_wire_names() {
        let filters = Filters {
            num_results: Some(3),
            ..Default::default()
        }
        .with_constraint("catalogSubject", "CS");

        let value = serde_json::to_value(&filters).unwrap();

        assert_eq!(value, json!({ "num_embeds": 3, "catalogSubject": "CS" }));
    }
}
