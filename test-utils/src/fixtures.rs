//! Test fixtures with sample contracts.
//!
//! Contracts are built as JSON documents so tests exercise the same decoding
//! path as files on disk.

use serde_json::{Value, json};

/// Consumer name used by the sample contracts.
pub const CONSUMER: &str = "order-web";

/// Provider name used by the sample contracts.
pub const PROVIDER: &str = "order-api";

/// Location the sample contracts are registered under.
pub const CONTRACT_LOCATION: &str = "pacts/order-web-order-api.json";

/// Build one interaction document.
#[must_use]
pub fn interaction(
    description: &str,
    provider_state: Option<&str>,
    method: &str,
    path: &str,
    status: u16,
    body: Option<Value>,
) -> Value {
    let mut response = json!({ "status": status });
    if let Some(body) = body {
        response["headers"] = json!({ "Content-Type": "application/json" });
        response["body"] = body;
    }

    let mut interaction = json!({
        "description": description,
        "request": { "method": method, "path": path },
        "response": response,
    });
    if let Some(state) = provider_state {
        interaction["providerState"] = json!(state);
    }
    interaction
}

/// Build a contract document between the sample participants.
#[must_use]
pub fn contract(interactions: Vec<Value>) -> String {
    contract_between(CONSUMER, PROVIDER, interactions)
}

/// Build a contract document between arbitrary participants.
#[must_use]
pub fn contract_between(consumer: &str, provider: &str, interactions: Vec<Value>) -> String {
    json!({
        "consumer": { "name": consumer },
        "provider": { "name": provider },
        "interactions": interactions,
        "metadata": { "pactSpecification": { "version": "2.0.0" } },
    })
    .to_string()
}

/// The `order 1 exists` interaction expecting `{"id":1,"status":"open"}`.
#[must_use]
pub fn order_exists() -> Value {
    interaction(
        "a request for order 1",
        Some("order 1 exists"),
        "GET",
        "/orders/1",
        200,
        Some(json!({ "id": 1, "status": "open" })),
    )
}

/// An interaction for a missing order, with no provider state.
#[must_use]
pub fn order_missing() -> Value {
    interaction("a request for a missing order", None, "GET", "/orders/99", 404, None)
}

/// Contract with [`order_exists`] and [`order_missing`].
#[must_use]
pub fn order_contract() -> String {
    contract(vec![order_exists(), order_missing()])
}
