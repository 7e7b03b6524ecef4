//! Pipeline Driver
//!
//! ```text
//! Init → ListShapes ─┬─ empty ──────────────────────────────────────→ Done
//!                    └─ per shape: Fetch → Redact → Assemble → Advise → Present → next
//! ```
//!
//! Shapes run one at a time in store order. Failure policy:
//! - listing shapes fails: run aborts
//! - fetching one shape fails: shape skipped
//! - redaction fails: run aborts (the store returned something that is not a command)
//! - advice fails: run aborts for credential problems, shape skipped otherwise

use std::io::Write;
use std::sync::Arc;

use super::advisor::{Advisor, AdvisorError};
use super::presenter::Presenter;
use super::prompt;
use super::redactor::{RedactionError, Redactor};
use super::selector::{QuerySelector, StoreError};
use crate::models::{QueryShapeId, RunOutcome, RunSummary};

/// Run-level failures. Every variant terminates the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(AdvisorError),

    #[error("Failed to list query shapes: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot redact query shape {shape}: {source}")]
    Redaction {
        shape: QueryShapeId,
        #[source]
        source: RedactionError,
    },

    #[error("Advisory backend failed on query shape {shape}: {source}")]
    Provider {
        shape: QueryShapeId,
        #[source]
        source: AdvisorError,
    },

    #[error("Failed to render redacted query: {0}")]
    Assemble(#[from] serde_json::Error),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

enum ShapeOutcome {
    Advised,
    Skipped,
}

pub struct Pipeline<W: Write> {
    selector: Arc<dyn QuerySelector>,
    advisor: Arc<dyn Advisor>,
    redactor: Redactor,
    presenter: Presenter<W>,
    database: String,
    min_millis: u64,
}

impl<W: Write + Send> Pipeline<W> {
    pub fn new(
        selector: Arc<dyn QuerySelector>,
        advisor: Arc<dyn Advisor>,
        out: W,
        database: impl Into<String>,
        min_millis: u64,
    ) -> Self {
        Self {
            selector,
            advisor,
            redactor: Redactor::default(),
            presenter: Presenter::new(out),
            database: database.into(),
            min_millis,
        }
    }

    /// Hand back the report sink
    pub fn into_output(self) -> W {
        self.presenter.into_inner()
    }

    pub async fn run(&mut self) -> Result<RunOutcome, PipelineError> {
        let shapes = self.selector.list_shapes(self.min_millis).await?;

        if shapes.is_empty() {
            tracing::info!(
                "No query shapes at or above {}ms in {}",
                self.min_millis,
                self.database
            );
            self.presenter.nothing_to_do(&self.database)?;
            return Ok(RunOutcome::NothingToDo);
        }

        tracing::info!("Found {} distinct query shapes", shapes.len());
        self.presenter.shapes(&shapes)?;

        let mut summary = RunSummary { shapes: shapes.len(), ..RunSummary::default() };
        for shape in &shapes {
            match self.process_shape(shape).await? {
                ShapeOutcome::Advised => summary.advised += 1,
                ShapeOutcome::Skipped => summary.skipped.push(shape.clone()),
            }
        }

        tracing::info!(
            shapes = summary.shapes,
            advised = summary.advised,
            skipped = summary.skipped.len(),
            "Run completed"
        );
        self.presenter.summary(&summary)?;

        Ok(RunOutcome::Completed(summary))
    }

    async fn process_shape(&mut self, shape: &QueryShapeId) -> Result<ShapeOutcome, PipelineError> {
        let entry = match self.selector.fetch_worst_sample(shape, self.min_millis).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Failed to find document for query shape {}: {}", shape, e);
                return Ok(ShapeOutcome::Skipped);
            },
        };
        tracing::debug!("Query shape {}: worst sample {}ms on {}", shape, entry.millis, entry.ns);

        let command = self
            .redactor
            .redact_command(&entry.command)
            .map_err(|source| PipelineError::Redaction { shape: shape.clone(), source })?;

        let payload = prompt::render_payload(&prompt::redacted_entry(&entry, command))?;
        let request = prompt::build_request(payload);

        let advice = match self.advisor.advise(&request).await {
            Ok(advice) => advice,
            Err(e @ AdvisorError::MissingCredential { .. }) => return Err(PipelineError::Config(e)),
            Err(e) if e.is_fatal() => {
                return Err(PipelineError::Provider { shape: shape.clone(), source: e });
            },
            Err(e) => {
                tracing::warn!("No advice for query shape {}: {}", shape, e);
                return Ok(ShapeOutcome::Skipped);
            },
        };

        self.presenter
            .present(shape, &request.user, &self.advisor.describe(), &advice)?;

        Ok(ShapeOutcome::Advised)
    }
}
