//! Advisory request assembly

use crate::models::{AdvisoryRequest, ProfileEntry, RedactedEntry};
use serde_json::{Map, Value};

const ESR_PROMPT: &str = include_str!("esr_prompt.md");

/// Fixed system instruction: answer with an index built by the ESR rule.
pub fn system_prompt() -> &'static str {
    ESR_PROMPT.trim()
}

/// Wrap a redacted command in the profiler envelope (`op`, `ns`, `millis`).
pub fn redacted_entry(entry: &ProfileEntry, command: Map<String, Value>) -> RedactedEntry {
    RedactedEntry { op: entry.op.clone(), ns: entry.ns.clone(), millis: entry.millis, command }
}

/// Pretty JSON of the redacted entry. Printed to the operator and sent
/// verbatim as the user message.
pub fn render_payload(entry: &RedactedEntry) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entry)
}

pub fn build_request(payload: String) -> AdvisoryRequest {
    AdvisoryRequest { system: system_prompt().to_string(), user: payload, max_tokens: None }
}
