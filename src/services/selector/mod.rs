//! Query Selector
//!
//! Picks one representative slow query per query shape from the profiler.
//!
//! # Contract
//! - `list_shapes`: distinct `queryHash` values of non-`getMore` query
//!   entries with a command document and `millis >= min_millis`.
//! - `fetch_worst_sample`: the slowest entry of one shape under the same
//!   duration filter, projected to `op`, `ns`, `millis`, `command`.
//!
//! Every store call is bounded by the store timeout; an expiry is final.

mod filters;
mod mongo;

use async_trait::async_trait;

use crate::models::{ProfileEntry, QueryShapeId};

pub use filters::{
    PROFILE_COLLECTION, SHAPE_FIELD, sample_filter, sample_projection, sample_sort, shapes_filter,
};
pub use mongo::{MongoQuerySelector, entry_from_document};

/// Profiling store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store operation timed out after {0}s")]
    Timeout(u64),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("No profiler entry found for query shape {0}")]
    NotFound(QueryShapeId),

    #[error("Malformed profiler entry: {0}")]
    Decode(String),
}

#[async_trait]
pub trait QuerySelector: Send + Sync {
    /// Distinct query shapes with at least one entry at or above `min_millis`
    async fn list_shapes(&self, min_millis: u64) -> Result<Vec<QueryShapeId>, StoreError>;

    /// Slowest entry recorded for `shape` at or above `min_millis`
    async fn fetch_worst_sample(
        &self,
        shape: &QueryShapeId,
        min_millis: u64,
    ) -> Result<ProfileEntry, StoreError>;
}
