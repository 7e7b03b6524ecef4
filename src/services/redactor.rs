//! Command document redaction
//!
//! Strips keys that carry connection/session details or literal collection
//! names, and replaces every remaining leaf with a sentinel so that only the
//! structure of the query (which fields, how they nest) leaves the process.

use serde_json::{Map, Value};
use std::collections::HashSet;

/// Keys removed at every nesting level of a command document.
pub const SENSITIVE_KEYS: [&str; 8] = [
    "projection",
    "lsid",
    "limit",
    "$db",
    "singleBatch",
    "find",
    "$clusterTime",
    "$readPreference",
];

/// Placeholder substituted for every non-mapping value.
pub const SENTINEL: &str = "redacted";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RedactionError {
    #[error("command document must be a mapping, found {found}")]
    NotAMapping { found: &'static str },
}

#[derive(Debug, Clone)]
pub struct Redactor {
    sensitive_keys: HashSet<String>,
    sentinel: Value,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(SENSITIVE_KEYS, Value::String(SENTINEL.to_string()))
    }
}

impl Redactor {
    pub fn new<I, S>(sensitive_keys: I, sentinel: Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { sensitive_keys: sensitive_keys.into_iter().map(Into::into).collect(), sentinel }
    }

    /// Redact a top-level command value.
    ///
    /// Command documents are always mappings; any other value means the
    /// upstream data is not what we think it is and is rejected.
    pub fn redact_command(&self, command: &Value) -> Result<Map<String, Value>, RedactionError> {
        match command {
            Value::Object(doc) => Ok(self.redact(doc)),
            other => Err(RedactionError::NotAMapping { found: value_kind(other) }),
        }
    }

    /// Build a redacted copy of `doc`. The input is left untouched.
    ///
    /// Sequences are not walked: a whole array collapses to the sentinel.
    pub fn redact(&self, doc: &Map<String, Value>) -> Map<String, Value> {
        doc.iter()
            .filter(|(key, _)| !self.sensitive_keys.contains(key.as_str()))
            .map(|(key, value)| {
                let redacted = match value {
                    Value::Object(nested) => Value::Object(self.redact(nested)),
                    _ => self.sentinel.clone(),
                };
                (key.clone(), redacted)
            })
            .collect()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
