use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde_json::Value;
use std::future::IntoFuture;
use std::time::Duration;

use super::filters::{
    PROFILE_COLLECTION, SHAPE_FIELD, sample_filter, sample_projection, sample_sort, shapes_filter,
};
use super::{QuerySelector, StoreError};
use crate::models::{ProfileEntry, QueryShapeId};
use crate::utils::unique_ordered;

const APP_NAME: &str = "index-advisor";

/// Query selector backed by a MongoDB `system.profile` collection.
pub struct MongoQuerySelector {
    client: Client,
    collection: Collection<Document>,
    timeout: Duration,
}

impl MongoQuerySelector {
    /// Connect to `uri` and verify the deployment answers a `ping`.
    pub async fn connect(uri: &str, database: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Invalid store connection string: {}", e);
            StoreError::Connection(e.to_string())
        })?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let selector = Self {
            collection: client.database(database).collection(PROFILE_COLLECTION),
            client,
            timeout,
        };

        selector
            .bounded(selector.client.database(database).run_command(doc! { "ping": 1 }))
            .await
            .map_err(|e| match e {
                StoreError::Query(msg) => StoreError::Connection(msg),
                other => other,
            })?;

        tracing::info!("Connected to profiling store, database={}", database);
        Ok(selector)
    }

    /// Close all pooled connections. Must be awaited before the process exits.
    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
        tracing::debug!("Profiling store connection closed");
    }

    async fn bounded<F, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, op.into_future()).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!("Store operation failed: {}", e);
                StoreError::Query(e.to_string())
            }),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl QuerySelector for MongoQuerySelector {
    async fn list_shapes(&self, min_millis: u64) -> Result<Vec<QueryShapeId>, StoreError> {
        let values = self
            .bounded(self.collection.distinct(SHAPE_FIELD, shapes_filter(min_millis)))
            .await?;

        tracing::debug!("Distinct {} values returned: {}", SHAPE_FIELD, values.len());

        let shapes = values
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(id) => Some(QueryShapeId::new(id)),
                other => {
                    tracing::warn!("Ignoring non-string {} value: {}", SHAPE_FIELD, other);
                    None
                },
            })
            .collect();

        Ok(unique_ordered(shapes))
    }

    async fn fetch_worst_sample(
        &self,
        shape: &QueryShapeId,
        min_millis: u64,
    ) -> Result<ProfileEntry, StoreError> {
        let find = self
            .collection
            .find_one(sample_filter(shape, min_millis))
            .sort(sample_sort())
            .projection(sample_projection());

        let document = self
            .bounded(find)
            .await?
            .ok_or_else(|| StoreError::NotFound(shape.clone()))?;

        entry_from_document(document)
    }
}

/// Decode a projected profiler document.
///
/// A missing `command` decodes to null so the redactor, not the store layer,
/// rejects it.
pub fn entry_from_document(mut document: Document) -> Result<ProfileEntry, StoreError> {
    let op = document
        .get_str("op")
        .map_err(|e| StoreError::Decode(format!("op: {}", e)))?
        .to_string();
    let ns = document
        .get_str("ns")
        .map_err(|e| StoreError::Decode(format!("ns: {}", e)))?
        .to_string();

    let millis = match document.get("millis") {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        Some(other) => {
            return Err(StoreError::Decode(format!(
                "millis has unexpected type {:?}",
                other.element_type()
            )));
        },
        None => return Err(StoreError::Decode("millis is missing".to_string())),
    };

    let command = document.remove("command").map(bson_to_json).unwrap_or(Value::Null);

    Ok(ProfileEntry { op, ns, millis, command })
}

/// Convert a command to JSON. Only documents become objects: ObjectId, dates,
/// regexes and the other BSON types map to one scalar leaf each.
fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Document(document) => Value::Object(
            document.into_iter().map(|(key, value)| (key, bson_to_json(value))).collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::String(s) | Bson::Symbol(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(v) => Value::from(v),
        Bson::Int64(v) => Value::from(v),
        Bson::Double(v) => serde_json::Number::from_f64(v)
            .map_or_else(|| Value::String(v.to_string()), Value::Number),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::RegularExpression(regex) => {
            Value::String(format!("/{}/{}", regex.pattern, regex.options))
        },
        other => Value::String(other.to_string()),
    }
}
