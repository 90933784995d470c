//! Matching rules.
//!
//! Rules are recorded under `response.matchingRules`, keyed by a JSONPath-like
//! expression such as `$.body.items[*].id` or `$.headers.Content-Type`. A rule
//! replaces exact equality at the path it names.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A predicate that weakens exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum MatchingRule {
    /// Same JSON type; on arrays, every element like the first expected one
    Type {
        /// Minimum array length
        min: Option<usize>,
        /// Maximum array length
        max: Option<usize>,
    },
    /// String form of the value fully matches the pattern
    Regex(RulePattern),
    /// Integral number
    Integer,
    /// Number with a fractional part
    Decimal,
    /// Exact equality, no subset tolerance
    Equality,
}

/// A regular expression compiled once, anchored to match the whole value.
#[derive(Debug, Clone)]
pub struct RulePattern {
    pattern: String,
    compiled: Regex,
}

impl RulePattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex error when the pattern does not compile.
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let compiled = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self { pattern, compiled })
    }

    /// Pattern as recorded.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether the whole of `text` matches.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for RulePattern {}

impl fmt::Display for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Type rule handed down to descendants of a node matched by type.
static CASCADED_TYPE: MatchingRule = MatchingRule::Type { min: None, max: None };

impl MatchingRule {
    /// Regex rule for `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex error when the pattern does not compile.
    pub fn regex(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        RulePattern::new(pattern).map(Self::Regex)
    }

    /// Rule children inherit when they have none of their own.
    #[must_use]
    pub fn cascaded(&self) -> Option<&'static Self> {
        matches!(self, Self::Type { .. }).then_some(&CASCADED_TYPE)
    }

    /// Check a single value against the rule, without descending.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `actual` does not satisfy the rule.
    pub fn check(&self, expected: &Value, actual: &Value) -> Result<(), String> {
        match self {
            Self::Type { .. } => {
                if same_json_type(expected, actual) {
                    Ok(())
                } else {
                    Err(format!(
                        "expected a value of type {} but found {} ({actual})",
                        json_type(expected),
                        json_type(actual)
                    ))
                }
            }
            Self::Regex(pattern) => {
                let text = match actual {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => return Err(format!("cannot match {other} against regex '{pattern}'")),
                };
                if pattern.is_match(&text) {
                    Ok(())
                } else {
                    Err(format!("'{text}' does not match regex '{pattern}'"))
                }
            }
            Self::Integer => {
                if actual.is_i64() || actual.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected an integer but found {actual}"))
                }
            }
            Self::Decimal => {
                if actual.is_f64() {
                    Ok(())
                } else {
                    Err(format!("expected a decimal number but found {actual}"))
                }
            }
            Self::Equality => {
                if values_equal(expected, actual) {
                    Ok(())
                } else {
                    Err(format!("expected {expected} but found {actual}"))
                }
            }
        }
    }
}

/// Equality that treats `1` and `1.0` as the same number.
#[must_use]
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        #[allow(clippy::float_cmp)]
        (Value::Number(e), Value::Number(a)) if e.is_f64() || a.is_f64() => e.as_f64() == a.as_f64(),
        _ => expected == actual,
    }
}

/// Whether two values have the same JSON type.
#[must_use]
pub fn same_json_type(expected: &Value, actual: &Value) -> bool {
    json_type(expected) == json_type(actual)
}

/// JSON type name of a value.
#[must_use]
pub const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Wire form of a rule: `{"match": "...", "regex": "...", "min": n, "max": n}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRule {
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<usize>,
}

impl TryFrom<RawRule> for MatchingRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let rule = match raw.kind.as_deref() {
            Some("type") => Self::Type { min: raw.min, max: raw.max },
            Some("regex") => compile(raw.regex.ok_or("regex rule without a 'regex' pattern")?)?,
            Some("integer") => Self::Integer,
            Some("decimal") => Self::Decimal,
            Some("equality") => Self::Equality,
            Some(other) => return Err(format!("unsupported matcher '{other}'")),
            None => match raw.regex {
                Some(pattern) => compile(pattern)?,
                None if raw.min.is_some() || raw.max.is_some() => {
                    Self::Type { min: raw.min, max: raw.max }
                }
                None => return Err("matching rule names no matcher".to_string()),
            },
        };

        Ok(rule)
    }
}

fn compile(pattern: String) -> Result<MatchingRule, String> {
    MatchingRule::regex(pattern.as_str()).map_err(|e| format!("invalid regex '{pattern}': {e}"))
}

impl From<MatchingRule> for RawRule {
    fn from(rule: MatchingRule) -> Self {
        let kind = |name: &str| Some(name.to_string());
        match rule {
            MatchingRule::Type { min, max } => Self { kind: kind("type"), min, max, ..Self::default() },
            MatchingRule::Regex(pattern) => Self {
                kind: kind("regex"),
                regex: Some(pattern.pattern),
                ..Self::default()
            },
            MatchingRule::Integer => Self { kind: kind("integer"), ..Self::default() },
            MatchingRule::Decimal => Self { kind: kind("decimal"), ..Self::default() },
            MatchingRule::Equality => Self { kind: kind("equality"), ..Self::default() },
        }
    }
}

/// One step of a path into a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

/// Location inside a body. Displays as `$` for the root, else `items[0].id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPath(Vec<PathToken>);

impl BodyPath {
    /// The body root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Child path for an object key.
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(PathToken::Key(key.to_string()));
        Self(tokens)
    }

    /// Child path for an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(PathToken::Index(index));
        Self(tokens)
    }

    /// Path tokens from the root.
    #[must_use]
    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }
}

impl fmt::Display for BodyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, token) in self.0.iter().enumerate() {
            match token {
                PathToken::Key(key) if i == 0 => write!(f, "{key}")?,
                PathToken::Key(key) => write!(f, ".{key}")?,
                PathToken::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Field(String),
    Index(usize),
    Any,
}

impl Selector {
    fn matches(&self, token: &PathToken) -> bool {
        match (self, token) {
            (Self::Any, _) => true,
            (Self::Field(name), PathToken::Key(key)) => name == key,
            (Self::Index(i), PathToken::Index(j)) => i == j,
            _ => false,
        }
    }
}

/// Parse `.a[0].b`, `[*]`, `.*` and `['key']` steps.
fn parse_selectors(mut rest: &str) -> Option<Vec<Selector>> {
    let mut selectors = Vec::new();
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            let end = tail.find(['.', '[']).unwrap_or(tail.len());
            let name = &tail[..end];
            if name.is_empty() {
                return None;
            }
            selectors.push(if name == "*" {
                Selector::Any
            } else {
                Selector::Field(name.to_string())
            });
            rest = &tail[end..];
        } else if let Some(tail) = rest.strip_prefix('[') {
            let end = tail.find(']')?;
            let inner = tail[..end].trim();
            selectors.push(if inner == "*" {
                Selector::Any
            } else if let Some(quoted) = inner
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
            {
                Selector::Field(quoted.to_string())
            } else {
                Selector::Index(inner.parse().ok()?)
            });
            rest = &tail[end + 1..];
        } else {
            return None;
        }
    }
    Some(selectors)
}

/// Matching rules of a response, keyed by path expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchingRules(BTreeMap<String, MatchingRule>);

impl MatchingRules {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule under a path expression.
    #[must_use]
    pub fn with_rule(mut self, path: impl Into<String>, rule: MatchingRule) -> Self {
        self.0.insert(path.into(), rule);
        self
    }

    /// Whether no rule is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most specific rule for a body path; fewer wildcards wins.
    #[must_use]
    pub fn body_rule(&self, path: &BodyPath) -> Option<&MatchingRule> {
        self.0
            .iter()
            .filter_map(|(key, rule)| {
                let selectors = parse_selectors(key.strip_prefix("$.body")?)?;
                let matched = selectors.len() == path.tokens().len()
                    && selectors.iter().zip(path.tokens()).all(|(s, t)| s.matches(t));
                matched.then(|| {
                    let wildcards = selectors.iter().filter(|s| **s == Selector::Any).count();
                    (wildcards, rule)
                })
            })
            .min_by_key(|(wildcards, _)| *wildcards)
            .map(|(_, rule)| rule)
    }

    /// Rule for a header, name compared case-insensitively.
    #[must_use]
    pub fn header_rule(&self, name: &str) -> Option<&MatchingRule> {
        self.0.iter().find_map(|(key, rule)| {
            let header = key
                .strip_prefix("$.headers.")
                .or_else(|| key.strip_prefix("$.header."))?;
            let header = header
                .strip_prefix("['")
                .and_then(|h| h.strip_suffix("']"))
                .unwrap_or(header);
            header.eq_ignore_ascii_case(name).then_some(rule)
        })
    }
}
