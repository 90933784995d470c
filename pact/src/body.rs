//! Body content normalization.
//!
//! A recorded or received HTTP body is canonicalised into an
//! [`HttpBodyContent`]: the resolved content type and encoding, the canonical
//! text and the structured view of the same data. For JSON content types the
//! structured view is the parsed document; for every other type it is the
//! text itself.

use serde_json::Value;
use thiserror::Error;

/// Content type assumed when none is supplied.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Errors raised while building or reading a body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// Neither a structured value nor raw content was supplied
    #[error("Invalid body: exactly one of a structured value or raw content is required")]
    Missing,

    /// Content declared as JSON does not parse
    #[error("Body declared as '{content_type}' is not valid JSON: {reason}")]
    MalformedJson {
        /// Resolved content type
        content_type: String,
        /// Parser message
        reason: String,
    },
}

/// Character encoding of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8
    #[default]
    Utf8,
    /// UTF-16, little endian
    Utf16Le,
    /// UTF-16, big endian
    Utf16Be,
    /// 7-bit US-ASCII
    Ascii,
    /// ISO-8859-1
    Latin1,
}

impl Encoding {
    /// Resolve an encoding from a charset label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf-16le" | "unicode" | "ucs-2" => Some(Self::Utf16Le),
            "utf-16be" | "unicodefffe" => Some(Self::Utf16Be),
            "us-ascii" | "ascii" => Some(Self::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Canonical charset label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Ascii => "us-ascii",
            Self::Latin1 => "iso-8859-1",
        }
    }

    /// Encode text. Characters the encoding cannot represent become `?`.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Decode bytes, replacing invalid sequences with U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '\u{FFFD}' })
                .collect(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

/// A trailing odd byte decodes to U+FFFD.
fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let pairs = bytes.chunks_exact(2);
    let odd = !pairs.remainder().is_empty();
    let units: Vec<u16> = pairs.map(|pair| unit([pair[0], pair[1]])).collect();
    let mut text = String::from_utf16_lossy(&units);
    if odd {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Media type of a content type, without parameters.
#[must_use]
pub fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Whether a content type denotes JSON (`application/json`, `text/json`, `*+json`).
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let media = media_type(content_type).to_ascii_lowercase();
    media == "application/json" || media == "text/json" || media.ends_with("+json")
}

/// Encoding named by the `charset` parameter of a content type.
#[must_use]
pub fn charset(content_type: &str) -> Option<Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Encoding::from_label(value)
        } else {
            None
        }
    })
}

/// Structured view of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpBody {
    /// Parsed JSON document
    Json(Value),
    /// Opaque text
    Text(String),
}

impl HttpBody {
    /// The body as a JSON value; text becomes a JSON string.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

/// A body in canonical form.
///
/// `content` and `body` are two views of the same data: for JSON content
/// types `content` is the serialization of `body`, for all others
/// `body` is `content` verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBodyContent {
    content_type: String,
    encoding: Encoding,
    content: String,
    body: Result<HttpBody, BodyError>,
}

impl HttpBodyContent {
    /// Build from either a structured value or raw content.
    ///
    /// A JSON `null` value counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Missing`] unless exactly one input is present.
    pub fn new(
        value: Option<Value>,
        content: Option<String>,
        content_type: Option<&str>,
        encoding: Option<Encoding>,
    ) -> Result<Self, BodyError> {
        match (value.filter(|v| !v.is_null()), content) {
            (Some(value), None) => Ok(Self::from_value(value, content_type, encoding)),
            (None, Some(content)) => Ok(Self::from_content(content, content_type, encoding)),
            _ => Err(BodyError::Missing),
        }
    }

    /// Build from a structured value.
    ///
    /// The canonical text is the JSON serialization of the value, except for
    /// a string under a non-JSON content type, which is taken as text.
    #[must_use]
    pub fn from_value(value: Value, content_type: Option<&str>, encoding: Option<Encoding>) -> Self {
        let content_type = resolve_content_type(content_type);
        let json = is_json_content_type(&content_type);
        let (content, body) = match value {
            Value::String(text) if !json => (text.clone(), HttpBody::Text(text)),
            value if json => (value.to_string(), HttpBody::Json(value)),
            value => {
                let text = value.to_string();
                (text.clone(), HttpBody::Text(text))
            }
        };

        Self {
            content_type,
            encoding: encoding.unwrap_or_default(),
            content,
            body: Ok(body),
        }
    }

    /// Build from raw text.
    ///
    /// JSON content is parsed eagerly but a parse failure is only reported
    /// by [`Self::body`]. Blank JSON content parses to `null`.
    #[must_use]
    pub fn from_content(
        content: impl Into<String>,
        content_type: Option<&str>,
        encoding: Option<Encoding>,
    ) -> Self {
        let content = content.into();
        let content_type = resolve_content_type(content_type);
        let body = if !is_json_content_type(&content_type) {
            Ok(HttpBody::Text(content.clone()))
        } else if content.trim().is_empty() {
            Ok(HttpBody::Json(Value::Null))
        } else {
            serde_json::from_str(&content)
                .map(HttpBody::Json)
                .map_err(|e| BodyError::MalformedJson {
                    content_type: content_type.clone(),
                    reason: e.to_string(),
                })
        };

        Self {
            content_type,
            encoding: encoding.unwrap_or_default(),
            content,
            body,
        }
    }

    /// Build from raw bytes, decoding with the given encoding.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>, encoding: Option<Encoding>) -> Self {
        let encoding = encoding.unwrap_or_default();
        Self::from_content(encoding.decode(bytes), content_type, Some(encoding))
    }

    /// Resolved content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Resolved encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Canonical text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the content type denotes JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        is_json_content_type(&self.content_type)
    }

    /// Structured view.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::MalformedJson`] when JSON content failed to parse.
    pub fn body(&self) -> Result<&HttpBody, BodyError> {
        self.body.as_ref().map_err(Clone::clone)
    }

    /// Structured view as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::MalformedJson`] when JSON content failed to parse.
    pub fn to_value(&self) -> Result<Value, BodyError> {
        self.body().map(HttpBody::to_value)
    }

    /// Canonical text encoded with the resolved encoding.
    #[must_use]
    pub fn content_bytes(&self) -> Vec<u8> {
        self.encoding.encode(&self.content)
    }
}

fn resolve_content_type(content_type: Option<&str>) -> String {
    content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
