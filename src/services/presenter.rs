//! Operator-facing report written to stdout
//!
//! Plain text only. Logs go to stderr so the report can be piped on its own.

use std::io::{self, Write};

use crate::models::{QueryShapeId, RunSummary};

const RULE_WIDTH: usize = 100;

pub struct Presenter<W: Write> {
    out: W,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn nothing_to_do(&mut self, database: &str) -> io::Result<()> {
        writeln!(self.out, "No suitable query shapes found in {} db", database)?;
        self.out.flush()
    }

    pub fn shapes(&mut self, shapes: &[QueryShapeId]) -> io::Result<()> {
        let ids: Vec<&str> = shapes.iter().map(QueryShapeId::as_str).collect();
        writeln!(self.out, "Distinct query shapes: [{}]", ids.join(", "))?;
        writeln!(self.out)
    }

    /// One shape block: id, redacted query, then the advice between rules.
    pub fn present(
        &mut self,
        shape: &QueryShapeId,
        redacted_query: &str,
        provider: &str,
        advice: &str,
    ) -> io::Result<()> {
        let rule = "-".repeat(RULE_WIDTH);

        writeln!(self.out, "Query shape: {}", shape)?;
        writeln!(self.out, "Redacted query:")?;
        writeln!(self.out, "{}", redacted_query)?;
        writeln!(self.out)?;
        writeln!(self.out, "Response from {}:", provider)?;
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "{}", advice)?;
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        writeln!(
            self.out,
            "Processed {} query shapes: {} advised, {} skipped",
            summary.shapes,
            summary.advised,
            summary.skipped.len()
        )?;
        self.out.flush()
    }
}
