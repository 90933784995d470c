//! Pact contract types.
//!
//! A contract is decoded fresh from its JSON document for every verification
//! run and never written back.

use crate::body::{HttpBodyContent, charset};
use crate::rules::MatchingRules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A Pact contract between consumer and provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    /// Consumer participant
    pub consumer: Participant,
    /// Provider participant
    pub provider: Participant,
    /// Contract interactions, in recorded order
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    /// Contract metadata
    #[serde(default)]
    pub metadata: ContractMetadata,
}

impl Contract {
    /// Decode a contract document.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the document is not a valid contract.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Interactions matching every supplied filter, in recorded order.
    ///
    /// An interaction without a provider state never matches a state filter.
    #[must_use]
    pub fn filter_by(&self, description: Option<&str>, provider_state: Option<&str>) -> Vec<&Interaction> {
        self.interactions
            .iter()
            .filter(|i| description.is_none_or(|d| i.description == d))
            .filter(|i| provider_state.is_none_or(|s| i.provider_state.as_deref() == Some(s)))
            .collect()
    }
}

/// A participant in a contract (consumer or provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Participant name
    pub name: String,
}

impl Participant {
    /// Create a new participant.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An interaction in a contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Interaction description
    pub description: String,
    /// Provider state (precondition)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    /// Expected request
    pub request: Request,
    /// Expected response
    pub response: Response,
}

/// Query string of a recorded request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Query {
    /// Raw query string (`a=1&b=2`)
    Raw(String),
    /// Parameter name to values
    Params(BTreeMap<String, Vec<String>>),
}

impl Query {
    /// Encoded query string without the leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Raw(raw) => raw.trim_start_matches('?').to_string(),
            Self::Params(params) => {
                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (name, values) in params {
                    for value in values {
                        serializer.append_pair(name, value);
                    }
                }
                serializer.finish()
            }
        }
    }
}

/// HTTP request in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Query string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    /// Request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Request {
    /// Normalized body, if one was recorded.
    #[must_use]
    pub fn body_content(&self) -> Option<HttpBodyContent> {
        self.body.as_ref().map(|body| recorded_body(body, &self.headers))
    }
}

/// HTTP response in an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Matching rules weakening exact comparison
    #[serde(default, skip_serializing_if = "MatchingRules::is_empty")]
    pub matching_rules: MatchingRules,
}

impl Response {
    /// Normalized body, if one was recorded.
    #[must_use]
    pub fn body_content(&self) -> Option<HttpBodyContent> {
        self.body.as_ref().map(|body| recorded_body(body, &self.headers))
    }
}

/// Case-insensitive header lookup.
#[must_use]
pub fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Content type of a recorded body: the declared header, else JSON for
/// objects and arrays.
fn recorded_content_type(body: &Value, headers: &HashMap<String, String>) -> Option<String> {
    header(headers, "Content-Type")
        .map(str::to_string)
        .or_else(|| (body.is_object() || body.is_array()).then(|| "application/json".to_string()))
}

fn recorded_body(body: &Value, headers: &HashMap<String, String>) -> HttpBodyContent {
    let content_type = recorded_content_type(body, headers);
    let encoding = content_type.as_deref().and_then(charset);
    HttpBodyContent::from_value(body.clone(), content_type.as_deref(), encoding)
}

/// Contract metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractMetadata {
    /// Pact specification version
    #[serde(rename = "pactSpecification", default)]
    pub pact_specification: PactSpecification,
}

/// Pact specification version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PactSpecification {
    /// Version string
    pub version: String,
}

impl Default for PactSpecification {
    fn default() -> Self {
        Self {
            version: "2.0.0".to_string(),
        }
    }
}
