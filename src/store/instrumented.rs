use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentStore, OrderByDesc, StoreError, Writes};
use crate::observability::metrics::Metrics;

/// Wraps another store and records the latency of every call.
pub struct InstrumentedStore {
    inner: Arc<dyn DocumentStore>,
    metrics: Metrics,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, metrics: Metrics) -> Self {
        Self { inner, metrics }
    }

    async fn timed<T, F>(&self, operation: &str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = call.await;
        self.metrics
            .store_latency_seconds
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        result
    }
}

#[async_trait]
impl DocumentStore for InstrumentedStore {
    async fn add(&self, collection: &str, writes: Writes) -> Result<Document, StoreError> {
        self.timed("add", self.inner.add(collection, writes)).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.timed("get", self.inner.get(collection, id)).await
    }

    async fn list(
        &self,
        collection: &str,
        order: Option<OrderByDesc<'_>>,
    ) -> Result<Vec<Document>, StoreError> {
        self.timed("list", self.inner.list(collection, order)).await
    }

    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        self.timed("find_eq", self.inner.find_eq(collection, field, value))
            .await
    }

    async fn update(&self, collection: &str, id: &str, writes: Writes) -> Result<(), StoreError> {
        self.timed("update", self.inner.update(collection, id, writes))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.timed("delete", self.inner.delete(collection, id)).await
    }

    async fn delete_all(&self, collection: &str) -> Result<usize, StoreError> {
        self.timed("delete_all", self.inner.delete_all(collection))
            .await
    }
}
