//! Comparison of an actual provider response against an expected one.
//!
//! Mismatches are collected, never raised. Bodies are compared as a subset:
//! every expected key must be present and match, extra actual keys are fine.
//! Only a body that claims JSON and does not parse is a hard error.

use crate::body::{BodyError, HttpBody, HttpBodyContent, charset};
use crate::client::ProviderResponse;
use crate::contract::{Response, header};
use crate::rules::{BodyPath, MatchingRule, MatchingRules, json_type, values_equal};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A single difference between expected and actual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mismatch {
    /// Status code differs
    Status {
        /// Expected status
        expected: u16,
        /// Actual status
        actual: u16,
    },
    /// Expected header missing or different
    Header {
        /// Header name as recorded
        name: String,
        /// Expected value
        expected: String,
        /// Actual value, `None` when absent
        actual: Option<String>,
    },
    /// Body differs at a path
    Body {
        /// Path inside the body
        path: String,
        /// Expected value at the path
        expected: Value,
        /// Actual value, `None` when absent
        actual: Option<Value>,
        /// What went wrong
        detail: String,
    },
}

impl Mismatch {
    /// Where the mismatch was found: `status`, the header name, or the body path.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Status { .. } => "status",
            Self::Header { name, .. } => name,
            Self::Body { path, .. } => path,
        }
    }

    /// Kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "StatusMismatch",
            Self::Header { .. } => "HeaderMismatch",
            Self::Body { .. } => "BodyMismatch",
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { expected, actual } => {
                write!(f, "StatusMismatch: expected status {expected} but was {actual}")
            }
            Self::Header {
                name,
                expected,
                actual: Some(actual),
            } => write!(
                f,
                "HeaderMismatch at '{name}': expected '{expected}' but was '{actual}'"
            ),
            Self::Header {
                name,
                expected,
                actual: None,
            } => write!(f, "HeaderMismatch at '{name}': expected '{expected}' but was missing"),
            Self::Body { path, detail, .. } => write!(f, "BodyMismatch at '{path}': {detail}"),
        }
    }
}

/// Ordered mismatches of one interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    mismatches: Vec<Mismatch>,
}

impl ComparisonResult {
    /// Whether nothing differed.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Mismatches in discovery order.
    #[must_use]
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Take the mismatches.
    #[must_use]
    pub fn into_mismatches(self) -> Vec<Mismatch> {
        self.mismatches
    }
}

/// Comparison cut short by a body that claims JSON and does not parse.
///
/// Status and header mismatches found before the body are kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source}")]
pub struct ComparisonError {
    /// Why the body could not be read
    pub source: BodyError,
    /// Mismatches found before the body
    pub mismatches: Vec<Mismatch>,
}

/// Compare status, headers and body of an actual response.
///
/// A provider body without a `Content-Type` is read under the expected
/// content type; if that does not parse, it is compared as plain text.
///
/// # Errors
///
/// Returns a [`ComparisonError`] when the provider declared a JSON content
/// type, the body does not parse, and the expected body needs its structure.
pub fn compare_response(
    expected: &Response,
    actual: &ProviderResponse,
) -> Result<ComparisonResult, ComparisonError> {
    let mut mismatches = Vec::new();

    if expected.status != actual.status {
        mismatches.push(Mismatch::Status {
            expected: expected.status,
            actual: actual.status,
        });
    }

    compare_headers(
        &expected.headers,
        &actual.headers,
        &expected.matching_rules,
        &mut mismatches,
    );

    if let Some(expected_body) = expected.body_content() {
        let declared = actual.content_type().is_some();
        let actual_body = actual_body_content(actual, &expected_body);
        if let Err(source) = compare_bodies(
            &expected_body,
            &actual_body,
            declared,
            &expected.matching_rules,
            &mut mismatches,
        ) {
            return Err(ComparisonError { source, mismatches });
        }
    }

    Ok(ComparisonResult { mismatches })
}

/// Actual body under its declared content type, or the expected one if the
/// provider declared none.
fn actual_body_content(actual: &ProviderResponse, expected: &HttpBodyContent) -> HttpBodyContent {
    let content_type = actual.content_type().unwrap_or(expected.content_type());
    HttpBodyContent::from_content(actual.body_text(), Some(content_type), charset(content_type))
}

fn compare_headers(
    expected: &HashMap<String, String>,
    actual: &HashMap<String, String>,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) {
    let mut names: Vec<&String> = expected.keys().collect();
    names.sort();

    for name in names {
        let expected_value = &expected[name];
        let actual_value = header(actual, name);
        let matched = match (actual_value, rules.header_rule(name)) {
            (None, _) => false,
            (Some(actual_value), Some(rule)) => rule
                .check(
                    &Value::String(expected_value.clone()),
                    &Value::String(actual_value.to_string()),
                )
                .is_ok(),
            (Some(actual_value), None) => header_values_equal(expected_value, actual_value),
        };

        if !matched {
            mismatches.push(Mismatch::Header {
                name: name.clone(),
                expected: expected_value.clone(),
                actual: actual_value.map(str::to_string),
            });
        }
    }
}

/// Header values are equal when their `,`/`;` separated parts are, ignoring
/// surrounding whitespace.
fn header_values_equal(expected: &str, actual: &str) -> bool {
    let parts = |value: &str| {
        value
            .split([',', ';'])
            .map(str::trim)
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    parts(expected) == parts(actual)
}

fn compare_bodies(
    expected: &HttpBodyContent,
    actual: &HttpBodyContent,
    declared: bool,
    rules: &MatchingRules,
    mismatches: &mut Vec<Mismatch>,
) -> Result<(), BodyError> {
    let (expected_value, actual_value) = match expected.body()? {
        HttpBody::Json(value) => {
            let actual_value = match actual.to_value() {
                Ok(actual_value) => actual_value,
                // undeclared, so only assumed to be JSON
                Err(_) if !declared => Value::String(actual.content().to_string()),
                Err(err) => return Err(err),
            };
            (value.clone(), actual_value)
        }
        HttpBody::Text(text) => (
            Value::String(text.clone()),
            Value::String(actual.content().to_string()),
        ),
    };

    BodyMatcher { rules, mismatches }.compare(&BodyPath::root(), &expected_value, &actual_value, None);
    Ok(())
}

struct BodyMatcher<'a> {
    rules: &'a MatchingRules,
    mismatches: &'a mut Vec<Mismatch>,
}

impl BodyMatcher<'_> {
    fn compare(
        &mut self,
        path: &BodyPath,
        expected: &Value,
        actual: &Value,
        inherited: Option<&MatchingRule>,
    ) {
        let rule = self.rules.body_rule(path).or(inherited);
        match rule {
            Some(rule @ MatchingRule::Type { min, max }) => {
                self.compare_like(path, expected, actual, rule, *min, *max);
            }
            Some(rule) => {
                if let Err(detail) = rule.check(expected, actual) {
                    self.mismatch(path, expected, Some(actual), detail);
                }
            }
            None => self.compare_subset(path, expected, actual),
        }
    }

    /// Default rule: expected is a minimal template of actual.
    fn compare_subset(&mut self, path: &BodyPath, expected: &Value, actual: &Value) {
        match (expected, actual) {
            (Value::Object(expected), Value::Object(actual)) => {
                for (key, expected_value) in expected {
                    let child = path.key(key);
                    match actual.get(key) {
                        Some(actual_value) => self.compare(&child, expected_value, actual_value, None),
                        None => self.missing(&child, expected_value),
                    }
                }
            }
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                if actual_items.len() < expected_items.len() {
                    self.mismatch(
                        path,
                        expected,
                        Some(actual),
                        format!(
                            "expected at least {} elements but found {}",
                            expected_items.len(),
                            actual_items.len()
                        ),
                    );
                }
                for (index, (e, a)) in expected_items.iter().zip(actual_items).enumerate() {
                    self.compare(&path.index(index), e, a, None);
                }
            }
            _ if values_equal(expected, actual) => {}
            _ => self.mismatch(
                path,
                expected,
                Some(actual),
                format!("expected {expected} but found {actual}"),
            ),
        }
    }

    /// Type rule: same shape, any values; arrays match their first template.
    fn compare_like(
        &mut self,
        path: &BodyPath,
        expected: &Value,
        actual: &Value,
        rule: &MatchingRule,
        min: Option<usize>,
        max: Option<usize>,
    ) {
        let cascaded = rule.cascaded();
        match (expected, actual) {
            (Value::Object(expected), Value::Object(actual)) => {
                for (key, expected_value) in expected {
                    let child = path.key(key);
                    match actual.get(key) {
                        Some(actual_value) => self.compare(&child, expected_value, actual_value, cascaded),
                        None => self.missing(&child, expected_value),
                    }
                }
            }
            (Value::Array(templates), Value::Array(actual_items)) => {
                let len = actual_items.len();
                if min.is_some_and(|min| len < min) || max.is_some_and(|max| len > max) {
                    let bounds = match (min, max) {
                        (Some(min), Some(max)) => format!("between {min} and {max}"),
                        (Some(min), None) => format!("at least {min}"),
                        (None, _) => format!("at most {}", max.unwrap_or_default()),
                    };
                    self.mismatch(
                        path,
                        expected,
                        Some(actual),
                        format!("expected {bounds} elements but found {len}"),
                    );
                }
                if let Some(template) = templates.first() {
                    for (index, item) in actual_items.iter().enumerate() {
                        self.compare(&path.index(index), template, item, cascaded);
                    }
                }
            }
            _ => {
                if let Err(detail) = rule.check(expected, actual) {
                    self.mismatch(path, expected, Some(actual), detail);
                }
            }
        }
    }

    fn missing(&mut self, path: &BodyPath, expected: &Value) {
        self.mismatch(
            path,
            expected,
            None,
            format!("expected {} {expected} but was missing", json_type(expected)),
        );
    }

    fn mismatch(&mut self, path: &BodyPath, expected: &Value, actual: Option<&Value>, detail: String) {
        self.mismatches.push(Mismatch::Body {
            path: path.to_string(),
            expected: expected.clone(),
            actual: actual.cloned(),
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expected(value: Value) -> Response {
        serde_json::from_value(value).unwrap()
    }

    fn json_response(status: u16, body: &Value) -> ProviderResponse {
        ProviderResponse::new(status).with_json_body(body)
    }

    #[test]
    fn test_extra_actual_keys_are_tolerated() {
        let expected = expected(json!({"status": 200, "body": {"id": 1}}));
        let actual = json_response(200, &json!({"id": 1, "extra": "x"}));

        let result = compare_response(&expected, &actual).unwrap();
        assert!(result.is_match(), "{:?}", result.mismatches());
    }

    #[test]
    fn test_missing_key_is_one_body_mismatch() {
        let expected = expected(json!({"status": 200, "body": {"id": 1, "name": "a"}}));
        let actual = json_response(200, &json!({"id": 1}));

        let result = compare_response(&expected, &actual).unwrap();
        assert_eq!(result.mismatches().len(), 1);
        let mismatch = &result.mismatches()[0];
        assert_eq!(mismatch.kind(), "BodyMismatch");
        assert_eq!(mismatch.path(), "name");
        assert!(matches!(mismatch, Mismatch::Body { actual: None, .. }));
    }

    #[test]
    fn test_status_mismatch() {
        let expected = expected(json!({"status": 200}));
        let result = compare_response(&expected, &ProviderResponse::new(404)).unwrap();
        assert_eq!(
            result.mismatches(),
            [Mismatch::Status {
                expected: 200,
                actual: 404
            }]
        );
        assert_eq!(result.mismatches()[0].path(), "status");
    }

    #[test]
    fn test_headers_are_a_subset_and_case_insensitive() {
        let expected = expected(json!({
            "status": 200,
            "headers": {"Content-Type": "application/json; charset=utf-8"}
        }));
        let actual = ProviderResponse::new(200)
            .with_header("content-type", "application/json;charset=utf-8")
            .with_header("x-request-id", "abc");

        assert!(compare_response(&expected, &actual).unwrap().is_match());
    }

    #[test]
    fn test_each_bad_header_is_one_mismatch() {
        let expected = expected(json!({
            "status": 200,
            "headers": {"Cache-Control": "no-store", "X-Version": "2"}
        }));
        let actual = ProviderResponse::new(200).with_header("x-version", "1");

        let result = compare_response(&expected, &actual).unwrap();
        assert_eq!(
            result.mismatches(),
            [
                Mismatch::Header {
                    name: "Cache-Control".to_string(),
                    expected: "no-store".to_string(),
                    actual: None,
                },
                Mismatch::Header {
                    name: "X-Version".to_string(),
                    expected: "2".to_string(),
                    actual: Some("1".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_header_regex_rule() {
        let expected = expected(json!({
            "status": 200,
            "headers": {"X-Trace": "abc-123"},
            "matchingRules": {"$.headers.X-Trace": {"match": "regex", "regex": "[a-z]+-\\d+"}}
        }));
        let actual = ProviderResponse::new(200).with_header("x-trace", "xyz-987");
        assert!(compare_response(&expected, &actual).unwrap().is_match());
    }

    #[test]
    fn test_arrays_are_positional_with_minimum_length() {
        let expected = expected(json!({"status": 200, "body": {"items": [{"id": 1}, {"id": 2}]}}));

        let longer = json_response(200, &json!({"items": [{"id": 1}, {"id": 2}, {"id": 3}]}));
        assert!(compare_response(&expected, &longer).unwrap().is_match());

        let shorter = json_response(200, &json!({"items": [{"id": 1}]}));
        let result = compare_response(&expected, &shorter).unwrap();
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].path(), "items");

        let reordered = json_response(200, &json!({"items": [{"id": 2}, {"id": 1}]}));
        let paths: Vec<_> = compare_response(&expected, &reordered)
            .unwrap()
            .mismatches()
            .iter()
            .map(|m| m.path().to_string())
            .collect();
        assert_eq!(paths, ["items[0].id", "items[1].id"]);
    }

    #[test]
    fn test_scalar_leaves_use_equality() {
        let expected = expected(json!({"status": 200, "body": {"total": 10, "paid": true}}));
        let actual = json_response(200, &json!({"total": 10.0, "paid": false}));

        let result = compare_response(&expected, &actual).unwrap();
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].path(), "paid");
    }

    #[test]
    fn test_type_rule_replaces_equality() {
        let expected = expected(json!({
            "status": 200,
            "body": {"id": 1, "name": "a"},
            "matchingRules": {"$.body.name": {"match": "type"}}
        }));

        let ok = json_response(200, &json!({"id": 1, "name": "something else"}));
        assert!(compare_response(&expected, &ok).unwrap().is_match());

        let wrong_type = json_response(200, &json!({"id": 1, "name": 7}));
        let result = compare_response(&expected, &wrong_type).unwrap();
        assert_eq!(result.mismatches()[0].path(), "name");
    }

    #[test]
    fn test_type_rule_cascades_and_applies_to_every_element() {
        let expected = expected(json!({
            "status": 200,
            "body": {"orders": [{"id": 1, "state": "OPEN"}]},
            "matchingRules": {
                "$.body.orders": {"min": 1, "match": "type"},
                "$.body.orders[*].state": {"match": "regex", "regex": "OPEN|CLOSED"}
            }
        }));

        let ok = json_response(
            200,
            &json!({"orders": [{"id": 5, "state": "OPEN"}, {"id": 6, "state": "CLOSED"}]}),
        );
        assert!(compare_response(&expected, &ok).unwrap().is_match());

        let bad = json_response(200, &json!({"orders": [{"id": "5", "state": "LOST"}]}));
        let paths: Vec<_> = compare_response(&expected, &bad)
            .unwrap()
            .mismatches()
            .iter()
            .map(|m| m.path().to_string())
            .collect();
        assert_eq!(paths, ["orders[0].id", "orders[0].state"]);

        let empty = json_response(200, &json!({"orders": []}));
        let result = compare_response(&expected, &empty).unwrap();
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].path(), "orders");
    }

    #[test]
    fn test_text_bodies_compare_exactly() {
        let expected = expected(json!({
            "status": 200,
            "headers": {"Content-Type": "text/plain"},
            "body": "pong"
        }));

        let ok = ProviderResponse::new(200)
            .with_header("content-type", "text/plain")
            .with_body("pong");
        assert!(compare_response(&expected, &ok).unwrap().is_match());

        let bad = ProviderResponse::new(200)
            .with_header("content-type", "text/plain")
            .with_body("pong!");
        let result = compare_response(&expected, &bad).unwrap();
        assert_eq!(result.mismatches()[0].path(), "$");
    }

    #[test]
    fn test_missing_content_type_falls_back_to_expected() {
        let expected = expected(json!({"status": 200, "body": {"id": 1}}));
        let actual = ProviderResponse::new(200).with_body(r#"{"id":1}"#);
        assert!(compare_response(&expected, &actual).unwrap().is_match());
    }

    #[test]
    fn test_actual_body_is_decoded_with_its_charset() {
        let expected = expected(json!({"status": 200, "body": {"name": "café"}}));
        let actual = ProviderResponse::new(200)
            .with_header("Content-Type", "application/json; charset=utf-16")
            .with_body(crate::body::Encoding::Utf16Le.encode(r#"{"name":"café"}"#));

        let result = compare_response(&expected, &actual).unwrap();
        assert!(result.is_match(), "{:?}", result.mismatches());
    }

    #[test]
    fn test_undeclared_text_body_is_a_body_mismatch() {
        let expected = expected(json!({"status": 200, "body": {"id": 1}}));
        let actual = ProviderResponse::new(404).with_body("Not Found");

        let result = compare_response(&expected, &actual).unwrap();
        assert_eq!(
            result.mismatches()[0],
            Mismatch::Status {
                expected: 200,
                actual: 404
            }
        );
        assert_eq!(result.mismatches().len(), 2);
        assert!(matches!(
            &result.mismatches()[1],
            Mismatch::Body { path, actual: Some(Value::String(text)), .. } if path == "$" && text == "Not Found"
        ));
    }

    #[test]
    fn test_malformed_json_is_a_hard_error() {
        let expected = expected(json!({"status": 200, "body": {"id": 1}}));
        let actual = ProviderResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body("{\"id\":");

        let err = compare_response(&expected, &actual).unwrap_err();
        assert!(matches!(err.source, BodyError::MalformedJson { .. }));
        assert!(err.mismatches.is_empty());
    }

    #[test]
    fn test_malformed_json_keeps_earlier_mismatches() {
        let expected = expected(json!({
            "status": 200,
            "headers": {"X-Version": "2"},
            "body": {"id": 1}
        }));
        let actual = ProviderResponse::new(500)
            .with_header("Content-Type", "application/json")
            .with_body("<html>oops</html>");

        let err = compare_response(&expected, &actual).unwrap_err();
        assert_eq!(
            err.mismatches,
            [
                Mismatch::Status {
                    expected: 200,
                    actual: 500
                },
                Mismatch::Header {
                    name: "X-Version".to_string(),
                    expected: "2".to_string(),
                    actual: None,
                },
            ]
        );
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_malformed_json_ignored_without_expected_body() {
        let expected = expected(json!({"status": 200}));
        let actual = ProviderResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body("{\"id\":");
        assert!(compare_response(&expected, &actual).unwrap().is_match());
    }

    #[test]
    fn test_mismatch_display() {
        let status = Mismatch::Status {
            expected: 200,
            actual: 404,
        };
        assert_eq!(status.to_string(), "StatusMismatch: expected status 200 but was 404");

        let header = Mismatch::Header {
            name: "ETag".to_string(),
            expected: "v1".to_string(),
            actual: None,
        };
        assert_eq!(header.to_string(), "HeaderMismatch at 'ETag': expected 'v1' but was missing");
    }
}
