use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A request as handed back to clients: the stored fields plus `id`, with
/// timestamps and ETA fields normalized.
pub type RequestRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    New,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::New => "new",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "new" => Ok(RequestStatus::New),
            "in_progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(AppError::Validation(
                "Invalid status. Must be: new, in_progress, completed, or cancelled".to_string(),
            )),
        }
    }
}

/// Per-field update operation.
///
/// A key missing from the payload is `Unchanged`, an explicit `null` is
/// `Clear`, anything else is `Set`. Use with `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<'de, T> Deserialize<'de> for FieldPatch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldPatch::Set(value),
            None => FieldPatch::Clear,
        })
    }
}

/// Create payload as received. Every field is optional here so missing ones
/// can be reported together.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    pub service_type: Option<Value>,
    pub car_model: Option<Value>,
    pub plate_number: Option<Value>,
    pub notes: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub price: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRequest {
    pub service_type: String,
    pub car_model: String,
    pub plate_number: String,
    pub notes: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `None` means priced at the point of service.
    pub price: Option<f64>,
}

impl TryFrom<CreateRequestInput> for NewServiceRequest {
    type Error = AppError;

    fn try_from(input: CreateRequestInput) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        if is_blank(&input.service_type) {
            missing.push("serviceType");
        }
        if is_blank(&input.car_model) {
            missing.push("carModel");
        }
        if is_blank(&input.notes) {
            missing.push("notes");
        }
        if input.latitude.is_none() {
            missing.push("latitude");
        }
        if input.longitude.is_none() {
            missing.push("longitude");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            service_type: text_field("serviceType", input.service_type)?,
            car_model: text_field("carModel", input.car_model)?,
            plate_number: match input.plate_number {
                None => String::new(),
                Some(value) => text_field("plateNumber", Some(value))?,
            },
            notes: text_field("notes", input.notes)?,
            latitude: coordinate("latitude", input.latitude)?,
            longitude: coordinate("longitude", input.longitude)?,
            price: input.price.as_ref().and_then(coerce_number),
        })
    }
}

/// Update payload as received.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestInput {
    #[serde(default)]
    pub status: FieldPatch<Value>,
    #[serde(default)]
    pub technician_id: FieldPatch<Value>,
    #[serde(default)]
    pub estimated_arrival_minutes: FieldPatch<Value>,
    #[serde(default)]
    pub rating: FieldPatch<Value>,
    #[serde(default)]
    pub review: FieldPatch<Value>,
}

/// A fully validated partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestUpdate {
    pub status: Option<RequestStatus>,
    pub technician: FieldPatch<String>,
    pub estimated_arrival_minutes: Option<u32>,
    pub rating: Option<u8>,
    /// `Some(None)` stores an explicit null review.
    pub review: Option<Option<String>>,
}

impl TryFrom<UpdateRequestInput> for RequestUpdate {
    type Error = AppError;

    fn try_from(input: UpdateRequestInput) -> Result<Self, Self::Error> {
        let status = match input.status {
            FieldPatch::Unchanged | FieldPatch::Clear => None,
            FieldPatch::Set(Value::String(raw)) if raw.is_empty() => None,
            FieldPatch::Set(Value::String(raw)) => Some(raw.parse::<RequestStatus>()?),
            FieldPatch::Set(other) => {
                return Err(AppError::Validation(format!(
                    "Invalid status {other}. Must be: new, in_progress, completed, or cancelled"
                )));
            }
        };

        let technician = match input.technician_id {
            FieldPatch::Unchanged => FieldPatch::Unchanged,
            FieldPatch::Clear => FieldPatch::Clear,
            FieldPatch::Set(Value::String(id)) if id.is_empty() => FieldPatch::Clear,
            FieldPatch::Set(Value::String(id)) => FieldPatch::Set(id),
            FieldPatch::Set(_) => {
                return Err(AppError::Validation(
                    "technicianId must be a string".to_string(),
                ));
            }
        };

        let estimated_arrival_minutes = match input.estimated_arrival_minutes {
            FieldPatch::Unchanged => None,
            FieldPatch::Clear => return Err(invalid_minutes()),
            FieldPatch::Set(value) => Some(arrival_minutes(&value).ok_or_else(invalid_minutes)?),
        };

        let rating = match input.rating {
            FieldPatch::Unchanged => None,
            FieldPatch::Clear => return Err(invalid_rating()),
            FieldPatch::Set(value) => Some(parse_rating(&value).ok_or_else(invalid_rating)?),
        };

        let review = match input.review {
            FieldPatch::Unchanged => None,
            FieldPatch::Clear => Some(None),
            FieldPatch::Set(Value::String(text)) if text.is_empty() => Some(None),
            FieldPatch::Set(Value::String(text)) => Some(Some(text)),
            FieldPatch::Set(_) => {
                return Err(AppError::Validation("review must be a string".to_string()));
            }
        };

        Ok(Self {
            status,
            technician,
            estimated_arrival_minutes,
            rating,
            review,
        })
    }
}

fn is_blank(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn text_field(name: &str, value: Option<Value>) -> Result<String, AppError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) | None => Ok(String::new()),
        Some(_) => Err(AppError::Validation(format!("{name} must be a string"))),
    }
}

fn coordinate(name: &str, value: Option<Value>) -> Result<f64, AppError> {
    value
        .as_ref()
        .and_then(coerce_number)
        .ok_or_else(|| AppError::Validation(format!("{name} must be a number")))
}

/// Numbers pass through; numeric strings are parsed. Anything else, and any
/// non-finite result, is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

fn arrival_minutes(value: &Value) -> Option<u32> {
    let minutes = coerce_number(value)?;
    if minutes < 0.0 || minutes > f64::from(u32::MAX) {
        return None;
    }
    Some(minutes.floor() as u32)
}

/// An integral rating in `1..=5`.
pub fn parse_rating(value: &Value) -> Option<u8> {
    let rating = value.as_f64()?;
    if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
        return None;
    }
    Some(rating as u8)
}

fn invalid_minutes() -> AppError {
    AppError::Validation("estimatedArrivalMinutes must be a non-negative number".to_string())
}

fn invalid_rating() -> AppError {
    AppError::Validation("rating must be between 1 and 5".to_string())
}
