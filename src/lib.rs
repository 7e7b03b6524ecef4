//! Index Advisor Library
//!
//! Picks the slowest profiler sample per query shape, redacts literal
//! values from its command, and asks a language model for an index built
//! with the ESR rule.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use services::{
    Advisor, AdvisorError, MongoQuerySelector, Pipeline, PipelineError, QuerySelector,
    Redactor, StoreError, build_advisor,
};

#[cfg(test)]
mod tests;
