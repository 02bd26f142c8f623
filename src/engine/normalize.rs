//! Read-side normalization of stored request documents.
//!
//! Documents may have been written by older clients, so none of these
//! helpers fail: a value that cannot be normalized passes through unchanged
//! or becomes null.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::models::catalog::price_text;
use crate::models::request::{coerce_number, RequestRecord};
use crate::store::{Document, StoreTimestamp};

pub const ETA_MINUTES: &str = "estimatedArrivalMinutes";
pub const ETA_TIMESTAMP: &str = "estimatedArrivalTimestamp";
pub const PRICE_TEXT: &str = "priceText";

pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Store-native timestamps become ISO-8601 strings; anything else is
/// returned as-is.
pub fn timestamp(value: &Value) -> Value {
    StoreTimestamp::from_value(value)
        .and_then(StoreTimestamp::to_datetime)
        .map(|at| Value::String(iso8601(at)))
        .unwrap_or_else(|| value.clone())
}

fn optional_timestamp(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|at| Value::String(iso8601(at.with_timezone(&Utc))))
            .unwrap_or_else(|_| Value::String(raw.clone())),
        Some(other) => timestamp(other),
    }
}

fn arrival_minutes(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Value::Number(n.clone()),
        Some(other) => coerce_number(other)
            .map(|minutes| Value::from(minutes.floor() as i64))
            .unwrap_or(Value::Null),
        None => Value::Null,
    }
}

/// Turns a stored request into the record shape clients receive. Both ETA
/// keys and `priceText` are always present.
pub fn request(doc: Document) -> RequestRecord {
    let Document { id, mut fields } = doc;

    for key in ["createdAt", "updatedAt"] {
        if let Some(raw) = fields.get(key) {
            let normalized = timestamp(raw);
            fields.insert(key.to_string(), normalized);
        }
    }

    let minutes = arrival_minutes(fields.get(ETA_MINUTES));
    let eta = optional_timestamp(fields.get(ETA_TIMESTAMP));
    fields.insert(ETA_MINUTES.to_string(), minutes);
    fields.insert(ETA_TIMESTAMP.to_string(), eta);

    let service_type = fields.get("serviceType").and_then(Value::as_str).unwrap_or_default();
    let display_price = price_text(service_type, fields.get("price").and_then(Value::as_f64));
    fields.insert(PRICE_TEXT.to_string(), Value::String(display_price));
    fields.insert("id".to_string(), Value::String(id));

    fields
}
