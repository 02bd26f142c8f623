use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Document, DocumentStore, FieldWrite, OrderByDesc, StoreError, StoreTimestamp, Writes};

type Collection = HashMap<String, Map<String, Value>>;

/// In-process document store.
///
/// Each collection lives behind a single dashmap shard lock, so a bulk
/// delete swaps the whole collection out atomically. Transaction times are
/// strictly increasing, which keeps `createdAt` ordering total even for
/// documents written within the same clock tick.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
    last_micros: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transaction_time(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let prev = match self.last_micros.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |last| Some(now.max(last + 1)),
        ) {
            Ok(prev) | Err(prev) => prev,
        };

        DateTime::from_timestamp_micros(now.max(prev + 1)).unwrap_or_else(Utc::now)
    }

    fn apply(&self, fields: &mut Map<String, Value>, writes: Writes) {
        let mut txn_time = None;

        for (name, write) in writes {
            match write {
                FieldWrite::Value(value) => {
                    fields.insert(name, value);
                }
                FieldWrite::Delete => {
                    fields.remove(&name);
                }
                FieldWrite::ServerTimestamp => {
                    let at = *txn_time.get_or_insert_with(|| self.transaction_time());
                    fields.insert(name, StoreTimestamp::from_datetime(at).to_value());
                }
                FieldWrite::Timestamp(at) => {
                    fields.insert(name, StoreTimestamp::from_datetime(at).to_value());
                }
            }
        }
    }
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, writes: Writes) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let mut fields = Map::new();
        self.apply(&mut fields, writes);

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields.clone());

        Ok(Document { id, fields })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let doc = self.collections.get(collection).and_then(|docs| {
            docs.get(id).map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            })
        });

        Ok(doc)
    }

    async fn list(
        &self,
        collection: &str,
        order: Option<OrderByDesc<'_>>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = match self.collections.get(collection) {
            Some(docs) => docs
                .iter()
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        if let Some(OrderByDesc(field)) = order {
            // Documents without a readable timestamp sort last.
            docs.sort_by_cached_key(|doc| {
                std::cmp::Reverse(doc.get(field).and_then(StoreTimestamp::from_value))
            });
        }

        Ok(docs)
    }

    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs
                .iter()
                .filter(|(_, fields)| fields.get(field) == Some(value))
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(docs)
    }

    async fn update(&self, collection: &str, id: &str, writes: Writes) -> Result<(), StoreError> {
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let fields = docs.get_mut(id).ok_or_else(|| not_found(collection, id))?;

        self.apply(fields, writes);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;

        docs.remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(collection, id))
    }

    async fn delete_all(&self, collection: &str) -> Result<usize, StoreError> {
        let removed = match self.collections.get_mut(collection) {
            Some(mut docs) => {
                let count = docs.len();
                docs.clear();
                count
            }
            None => 0,
        };

        Ok(removed)
    }
}
