//! Advisory request and run result types

use serde::Serialize;

use super::profile::QueryShapeId;

/// Two-message exchange sent to an advisory backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryRequest {
    /// Fixed instruction describing the index-design rule
    pub system: String,
    /// Pretty-printed redacted profile entry
    pub user: String,
    /// Per-request output bound; backends fall back to their configured value
    pub max_tokens: Option<u32>,
}

/// Redacted profile entry, serialized verbatim as the user payload.
#[derive(Debug, Clone, Serialize)]
pub struct RedactedEntry {
    pub op: String,
    pub ns: String,
    pub millis: i64,
    pub command: serde_json::Map<String, serde_json::Value>,
}

/// Per-run counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub shapes: usize,
    pub advised: usize,
    pub skipped: Vec<QueryShapeId>,
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No profiler entry matched the duration filter
    NothingToDo,
    Completed(RunSummary),
}
