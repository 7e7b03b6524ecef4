//! Profiler data as seen by the advisor
//!
//! Entries are fetched once per query shape, redacted and printed, then dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque grouping key for profiler entries sharing one query plan
/// (the profiler's `queryHash`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryShapeId(String);

impl QueryShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryShapeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One profiler record, projected to the fields the advisor needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Operation type (`op`), always `query` for selected entries
    pub op: String,
    /// Namespace (`ns`), `<db>.<collection>`
    pub ns: String,
    /// Execution duration in milliseconds
    pub millis: i64,
    /// Full command document. Expected to be a mapping; anything else is
    /// rejected by the redactor.
    pub command: serde_json::Value,
}
