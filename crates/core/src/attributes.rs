//! Attribute normalization: raw source payloads to typed attribute values.
//!
//! The attribute kind for each field is decided once at configuration time
//! via [`AttributeConfig`], never re-sniffed from the shape of individual
//! records. A payload key with no configured kind falls back to
//! [`AttributeKind::Plain`]; a value that does not fit its configured kind
//! is reported back by name and skipped, not guessed at.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default text format applied when the source omits one.
pub const DEFAULT_TEXT_FORMAT: &str = "basic_html";

/// The configured kind of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Formatted text: `{ "value": ..., "format": ... }`.
    TextWithFormat,
    /// A reference to another migrated entity, carried as a source ID.
    Reference,
    /// A file or image, carried as a URL to download.
    File,
    /// Any scalar or structure passed through untouched.
    Plain,
}

/// A normalized attribute value, one variant per configured kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeValue {
    Text { value: String, format: String },
    Reference { source_id: String },
    File { url: String },
    Plain { value: Value },
}

/// Attribute name to kind, decided when the migration unit is configured.
/// Serializes as the bare name-to-kind map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeConfig {
    kinds: HashMap<String, AttributeKind>,
}

impl AttributeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, kind: AttributeKind) -> Self {
        self.kinds.insert(name.to_string(), kind);
        self
    }

    /// The configured kind for `name`, defaulting to `Plain`.
    pub fn kind_of(&self, name: &str) -> AttributeKind {
        self.kinds.get(name).copied().unwrap_or(AttributeKind::Plain)
    }
}

/// The result of normalizing one payload.
#[derive(Debug, Clone, Default)]
pub struct NormalizedAttributes {
    /// Attributes that normalized cleanly, in payload order.
    pub values: Vec<(String, AttributeValue)>,
    /// Names of attributes whose raw value did not fit the configured
    /// kind. These are logged by the caller and omitted from the write;
    /// the record itself still proceeds.
    pub failed: Vec<String>,
}

/// Normalize a raw payload against the unit's attribute configuration.
///
/// Per-attribute failure is non-fatal: a bad value lands in `failed` and
/// the rest of the bag is still produced.
pub fn normalize_payload(
    payload: &serde_json::Map<String, Value>,
    config: &AttributeConfig,
) -> NormalizedAttributes {
    let mut out = NormalizedAttributes::default();

    for (name, raw) in payload {
        match normalize_one(raw, config.kind_of(name)) {
            Some(value) => out.values.push((name.clone(), value)),
            None => out.failed.push(name.clone()),
        }
    }

    out
}

fn normalize_one(raw: &Value, kind: AttributeKind) -> Option<AttributeValue> {
    match kind {
        AttributeKind::TextWithFormat => normalize_text(raw),
        AttributeKind::Reference => as_id_string(raw).map(|source_id| AttributeValue::Reference { source_id }),
        AttributeKind::File => raw
            .as_str()
            .or_else(|| raw.get("url").and_then(Value::as_str))
            .map(|url| AttributeValue::File { url: url.to_string() }),
        AttributeKind::Plain => Some(AttributeValue::Plain { value: raw.clone() }),
    }
}

/// Text arrives either as a bare string or as `{ value, format? }`.
fn normalize_text(raw: &Value) -> Option<AttributeValue> {
    if let Some(s) = raw.as_str() {
        return Some(AttributeValue::Text {
            value: s.to_string(),
            format: DEFAULT_TEXT_FORMAT.to_string(),
        });
    }

    let value = raw.get("value")?.as_str()?.to_string();
    let format = raw
        .get("format")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TEXT_FORMAT)
        .to_string();
    Some(AttributeValue::Text { value, format })
}

/// Source IDs appear as strings or bare integers.
fn as_id_string(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
