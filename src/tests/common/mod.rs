// Common test utilities and helpers

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::models::{AdvisoryRequest, ProfileEntry, QueryShapeId};
use crate::services::advisor::{Advisor, AdvisorError};
use crate::services::selector::{QuerySelector, StoreError};

/// In-memory profiler. Shapes without a sample fail to fetch with a timeout.
#[derive(Default)]
pub struct FakeSelector {
    shapes: Vec<QueryShapeId>,
    samples: HashMap<QueryShapeId, ProfileEntry>,
    list_fails: bool,
    pub fetched: Mutex<Vec<QueryShapeId>>,
}

impl FakeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_list() -> Self {
        Self { list_fails: true, ..Self::default() }
    }

    /// Register a shape whose fetch succeeds
    pub fn with_sample(mut self, shape: &str, command: Value) -> Self {
        let id = QueryShapeId::new(shape);
        self.shapes.push(id.clone());
        self.samples.insert(id, sample_entry(command));
        self
    }

    /// Register a shape whose fetch fails
    pub fn with_broken_shape(mut self, shape: &str) -> Self {
        self.shapes.push(QueryShapeId::new(shape));
        self
    }

    pub fn fetched(&self) -> Vec<QueryShapeId> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuerySelector for FakeSelector {
    async fn list_shapes(&self, _min_millis: u64) -> Result<Vec<QueryShapeId>, StoreError> {
        if self.list_fails {
            return Err(StoreError::Timeout(10));
        }
        Ok(self.shapes.clone())
    }

    async fn fetch_worst_sample(
        &self,
        shape: &QueryShapeId,
        _min_millis: u64,
    ) -> Result<ProfileEntry, StoreError> {
        self.fetched.lock().unwrap().push(shape.clone());
        self.samples.get(shape).cloned().ok_or(StoreError::Timeout(10))
    }
}

/// Scripted advisory backend. Answers from the queue, then with a default index.
#[derive(Default)]
pub struct FakeAdvisor {
    responses: Mutex<VecDeque<Result<String, AdvisorError>>>,
    pub requests: Mutex<Vec<AdvisoryRequest>>,
}

impl FakeAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, response: Result<String, AdvisorError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<AdvisoryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Advisor for FakeAdvisor {
    fn describe(&self) -> String {
        "Fake (test)".to_string()
    }

    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("db.orders.createIndex({ status: 1 })".to_string()))
    }
}

pub fn sample_entry(command: Value) -> ProfileEntry {
    ProfileEntry { op: "query".to_string(), ns: "shop.orders".to_string(), millis: 420, command }
}

/// Typical find command as recorded by the profiler
pub fn find_command() -> Value {
    json!({
        "find": "orders",
        "filter": { "status": "open", "customerId": 1234, "total": { "$gt": 99.5 } },
        "sort": { "createdAt": -1 },
        "limit": 20,
        "lsid": { "id": "5f0c" },
        "$db": "shop"
    })
}
