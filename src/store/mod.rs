//! Document store boundary.
//!
//! The hosted document database is the system of record. Everything above
//! this module talks to it through [`DocumentStore`], which keeps the domain
//! layer free of any particular driver and lets tests run against
//! [`MemoryStore`].

pub mod instrumented;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use instrumented::InstrumentedStore;
pub use memory::MemoryStore;

pub const REQUESTS: &str = "requests";
pub const TECHNICIANS: &str = "technicians";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("{0}")]
    Backend(String),
}

/// A stored document: the store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// One field-level write inside an add or update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    Value(Value),
    /// Removes the field from the document entirely.
    Delete,
    /// Resolved by the store to its own transaction time.
    ServerTimestamp,
    Timestamp(DateTime<Utc>),
}

pub type Writes = Vec<(String, FieldWrite)>;

/// Ordering applied by [`DocumentStore::list`]; always descending.
#[derive(Debug, Clone, Copy)]
pub struct OrderByDesc<'a>(pub &'a str);

/// Native timestamp representation, as the hosted store serializes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreTimestamp {
    #[serde(rename = "_seconds", alias = "seconds")]
    pub seconds: i64,
    #[serde(rename = "_nanoseconds", alias = "nanoseconds", default)]
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanoseconds: at.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }

    /// Reads a native timestamp back out of a stored field value.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({
            "_seconds": self.seconds,
            "_nanoseconds": self.nanoseconds,
        })
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document under a fresh id and returns it with every
    /// timestamp write resolved.
    async fn add(&self, collection: &str, writes: Writes) -> Result<Document, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn list(
        &self,
        collection: &str,
        order: Option<OrderByDesc<'_>>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Documents whose `field` equals `value` exactly.
    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Merges `writes` into an existing document. Fields not named in
    /// `writes` are left untouched. Fails with [`StoreError::NotFound`] when
    /// the id does not exist.
    async fn update(&self, collection: &str, id: &str, writes: Writes) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Removes every document of a collection in one atomic batch and
    /// returns how many were removed.
    async fn delete_all(&self, collection: &str) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn timestamp_round_trips_through_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let ts = StoreTimestamp::from_datetime(at);
        assert_eq!(ts.to_datetime(), Some(at));
    }

    #[test]
    fn timestamp_reads_underscored_and_plain_keys() {
        let underscored = json!({ "_seconds": 10, "_nanoseconds": 5 });
        let plain = json!({ "seconds": 10 });

        assert_eq!(
            StoreTimestamp::from_value(&underscored),
            Some(StoreTimestamp {
                seconds: 10,
                nanoseconds: 5
            })
        );
        assert_eq!(
            StoreTimestamp::from_value(&plain),
            Some(StoreTimestamp {
                seconds: 10,
                nanoseconds: 0
            })
        );
    }

    #[test]
    fn timestamp_rejects_non_objects() {
        assert_eq!(StoreTimestamp::from_value(&json!("2024-01-01")), None);
        assert_eq!(StoreTimestamp::from_value(&json!(12)), None);
    }
}
