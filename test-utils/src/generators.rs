//! Shared proptest generators.
//!
//! Strategies for JSON bodies, header names and contract interactions.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Generate JSON scalars.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Generate JSON values up to three levels deep.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    json_scalar_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate JSON objects with at least one field.
pub fn json_object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", json_value_strategy(), 1..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Generate HTTP header names.
pub fn header_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Content-Type".to_string()),
        Just("Cache-Control".to_string()),
        Just("X-Request-Id".to_string()),
        "X-[A-Z][a-z]{2,10}",
    ]
}

/// Generate interaction descriptions.
pub fn description_strategy() -> impl Strategy<Value = String> {
    "[a-z]{3,10}( [a-z]{2,8}){0,3}"
}

/// Generate optional provider state names drawn from a small pool so
/// filters hit more than one interaction.
pub fn provider_state_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("order 1 exists".to_string())),
        Just(Some("no orders".to_string())),
        Just(Some("customer is blocked".to_string())),
    ]
}

/// Generate a list of interaction documents, each answered by `200 {}`.
pub fn interactions_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec((description_strategy(), provider_state_strategy()), 0..12).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (description, state))| {
                let mut interaction = json!({
                    "description": description,
                    "request": { "method": "GET", "path": format!("/items/{index}") },
                    "response": { "status": 200 },
                });
                if let Some(state) = state {
                    interaction["providerState"] = json!(state);
                }
                interaction
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_json_object_strategy_is_non_empty(object in json_object_strategy()) {
            prop_assert!(!object.is_empty());
        }

        #[test]
        fn test_interactions_have_unique_paths(interactions in interactions_strategy()) {
            let mut paths: Vec<_> = interactions
                .iter()
                .map(|i| i["request"]["path"].as_str().unwrap_or_default().to_string())
                .collect();
            let total = paths.len();
            paths.dedup();
            prop_assert_eq!(paths.len(), total);
        }
    }
}
