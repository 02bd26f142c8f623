use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{self, PasswordError};
use crate::engine::lifecycle::validate_id;
use crate::engine::normalize;
use crate::error::AppError;
use crate::models::technician::{
    CreateTechnicianInput, LoginInput, LoginOutcome, Technician, TechnicianStatus,
};
use crate::store::{Document, DocumentStore, FieldWrite, OrderByDesc, TECHNICIANS};

const PASSWORD_HASH: &str = "passwordHash";

/// Technician accounts: creation, listing, login and removal.
pub struct TechnicianRegistry {
    store: Arc<dyn DocumentStore>,
}

impl TechnicianRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns the new technician's id.
    pub async fn create(&self, input: CreateTechnicianInput) -> Result<String, AppError> {
        let name = required("name", input.name)?;
        let phone = required("phone", input.phone)?;
        let password = required("password", input.password)?;

        let hash = blocking(move || auth::hash_password(&password)).await?;

        let doc = self
            .store
            .add(
                TECHNICIANS,
                vec![
                    ("name".to_string(), FieldWrite::Value(Value::from(name))),
                    ("phone".to_string(), FieldWrite::Value(Value::from(phone))),
                    (PASSWORD_HASH.to_string(), FieldWrite::Value(Value::from(hash))),
                    (
                        "status".to_string(),
                        FieldWrite::Value(Value::from(TechnicianStatus::Available.as_str())),
                    ),
                    ("createdAt".to_string(), FieldWrite::ServerTimestamp),
                ],
            )
            .await?;

        info!(technician_id = %doc.id, "technician created");
        Ok(doc.id)
    }

    /// All technicians, newest first.
    pub async fn list(&self) -> Result<Vec<Technician>, AppError> {
        let docs = self
            .store
            .list(TECHNICIANS, Some(OrderByDesc("createdAt")))
            .await?;

        Ok(docs.into_iter().map(technician_view).collect())
    }

    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome, AppError> {
        let (Some(phone), Some(password)) = (input.phone, input.password) else {
            return Err(invalid_login());
        };

        let candidates = self
            .store
            .find_eq(TECHNICIANS, "phone", &Value::from(phone))
            .await?;

        for doc in candidates {
            let Some(hash) = doc.get_str(PASSWORD_HASH).map(str::to_string) else {
                warn!(technician_id = %doc.id, "technician has no password hash; login refused");
                continue;
            };

            let attempt = password.clone();
            match blocking(move || auth::verify_password(&attempt, &hash)).await {
                Ok(true) => {
                    info!(technician_id = %doc.id, "technician logged in");
                    return Ok(LoginOutcome {
                        name: doc.get_str("name").unwrap_or_default().to_string(),
                        id: doc.id,
                    });
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(technician_id = %doc.id, error = %err, "stored credential unusable");
                }
            }
        }

        Err(invalid_login())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        validate_id(id, "technician")?;

        if self.store.get(TECHNICIANS, id).await?.is_none() {
            return Err(AppError::NotFound(format!("technician {id} not found")));
        }
        self.store.delete(TECHNICIANS, id).await?;

        info!(technician_id = %id, "technician deleted");
        Ok(())
    }
}

fn technician_view(doc: Document) -> Technician {
    let status = doc
        .get("status")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
        .unwrap_or_default();

    Technician {
        name: doc.get_str("name").unwrap_or_default().to_string(),
        phone: doc.get_str("phone").unwrap_or_default().to_string(),
        status,
        created_at: doc
            .get("createdAt")
            .map(normalize::timestamp)
            .unwrap_or(Value::Null),
        id: doc.id,
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn invalid_login() -> AppError {
    AppError::Unauthorized("Invalid login".to_string())
}

/// Runs a password hash or verify on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| AppError::Internal(format!("password task failed: {err}")))?
        .map_err(|err| AppError::Internal(err.to_string()))
}
