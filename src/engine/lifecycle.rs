use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AssignmentPolicy;
use crate::engine::normalize::{self, ETA_MINUTES, ETA_TIMESTAMP};
use crate::error::AppError;
use crate::models::request::{
    CreateRequestInput, FieldPatch, NewServiceRequest, RequestRecord, RequestStatus,
    RequestUpdate, UpdateRequestInput,
};
use crate::store::{DocumentStore, FieldWrite, OrderByDesc, Writes, REQUESTS};

/// Owns the service request lifecycle on top of the document store.
pub struct RequestLifecycle {
    store: Arc<dyn DocumentStore>,
    policy: AssignmentPolicy,
    verify_writes: bool,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn DocumentStore>, policy: AssignmentPolicy) -> Self {
        Self {
            store,
            policy,
            verify_writes: false,
        }
    }

    /// Re-read every updated request in the background and log what the
    /// store holds. Never affects the update's result.
    pub fn with_write_verification(mut self, enabled: bool) -> Self {
        self.verify_writes = enabled;
        self
    }

    pub async fn create(&self, input: CreateRequestInput) -> Result<RequestRecord, AppError> {
        let new = NewServiceRequest::try_from(input)?;
        let doc = self.store.add(REQUESTS, create_writes(&new)).await?;

        info!(
            request_id = %doc.id,
            service_type = %new.service_type,
            "service request created"
        );

        Ok(normalize::request(doc))
    }

    pub async fn get(&self, id: &str) -> Result<RequestRecord, AppError> {
        let doc = self
            .store
            .get(REQUESTS, id)
            .await?
            .ok_or_else(|| request_not_found(id))?;

        Ok(normalize::request(doc))
    }

    /// All requests, newest first.
    pub async fn list(&self) -> Result<Vec<RequestRecord>, AppError> {
        let docs = self
            .store
            .list(REQUESTS, Some(OrderByDesc("createdAt")))
            .await?;

        debug!(count = docs.len(), "listed service requests");
        Ok(docs.into_iter().map(normalize::request).collect())
    }

    pub async fn update(&self, id: &str, input: UpdateRequestInput) -> Result<(), AppError> {
        let update = RequestUpdate::try_from(input)?;
        self.apply(id, &update, Utc::now()).await
    }

    /// Persists an already validated update. `now` anchors the arrival
    /// estimate.
    pub async fn apply(
        &self,
        id: &str,
        update: &RequestUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let writes = update_writes(update, self.policy, now);

        self.store.update(REQUESTS, id, writes).await?;

        info!(
            request_id = %id,
            status = ?update.status,
            technician = ?update.technician,
            eta_minutes = ?update.estimated_arrival_minutes,
            rating = ?update.rating,
            "service request updated"
        );

        if self.verify_writes {
            self.spawn_verification(id.to_string());
        }

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        validate_id(id, "request")?;

        if self.store.get(REQUESTS, id).await?.is_none() {
            return Err(request_not_found(id));
        }
        self.store.delete(REQUESTS, id).await?;

        info!(request_id = %id, "service request deleted");
        Ok(())
    }

    /// Removes every request in one batch and returns how many were removed.
    pub async fn delete_all(&self) -> Result<usize, AppError> {
        let deleted = self.store.delete_all(REQUESTS).await?;
        info!(deleted, "all service requests deleted");
        Ok(deleted)
    }

    fn spawn_verification(&self, id: String) {
        let store = self.store.clone();

        tokio::spawn(async move {
            match store.get(REQUESTS, &id).await {
                Ok(Some(doc)) => debug!(
                    request_id = %id,
                    status = ?doc.get("status"),
                    technician_id = ?doc.get("technicianId"),
                    "update verified"
                ),
                Ok(None) => warn!(request_id = %id, "request missing after update"),
                Err(err) => warn!(request_id = %id, error = %err, "update verification failed"),
            }
        });
    }
}

/// Rejects ids that are empty or that a client serialized from a missing
/// value.
pub fn validate_id(id: &str, kind: &str) -> Result<(), AppError> {
    if id.trim().is_empty() || id == "undefined" || id == "null" {
        return Err(AppError::Validation(format!("invalid {kind} id: {id:?}")));
    }
    Ok(())
}

fn request_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("request {id} not found"))
}

fn create_writes(new: &NewServiceRequest) -> Writes {
    vec![
        ("serviceType".to_string(), FieldWrite::Value(Value::from(new.service_type.clone()))),
        ("carModel".to_string(), FieldWrite::Value(Value::from(new.car_model.clone()))),
        ("plateNumber".to_string(), FieldWrite::Value(Value::from(new.plate_number.clone()))),
        ("notes".to_string(), FieldWrite::Value(Value::from(new.notes.clone()))),
        ("latitude".to_string(), FieldWrite::Value(Value::from(new.latitude))),
        ("longitude".to_string(), FieldWrite::Value(Value::from(new.longitude))),
        ("price".to_string(), FieldWrite::Value(new.price.map_or(Value::Null, Value::from))),
        (
            "status".to_string(),
            FieldWrite::Value(Value::from(RequestStatus::New.as_str())),
        ),
        ("createdAt".to_string(), FieldWrite::ServerTimestamp),
        ("updatedAt".to_string(), FieldWrite::ServerTimestamp),
    ]
}

fn update_writes(update: &RequestUpdate, policy: AssignmentPolicy, now: DateTime<Utc>) -> Writes {
    let mut writes = Writes::new();

    let mut status = update.status;
    match &update.technician {
        FieldPatch::Unchanged => {}
        FieldPatch::Set(technician_id) => {
            writes.push((
                "technicianId".to_string(),
                FieldWrite::Value(Value::from(technician_id.clone())),
            ));
            if policy == AssignmentPolicy::StartOnAssign && status.is_none() {
                status = Some(RequestStatus::InProgress);
            }
        }
        FieldPatch::Clear => writes.push(("technicianId".to_string(), FieldWrite::Delete)),
    }

    if let Some(status) = status {
        writes.push((
            "status".to_string(),
            FieldWrite::Value(Value::from(status.as_str())),
        ));
    }

    if let Some(minutes) = update.estimated_arrival_minutes {
        writes.push((ETA_MINUTES.to_string(), FieldWrite::Value(Value::from(minutes))));
        writes.push((
            ETA_TIMESTAMP.to_string(),
            FieldWrite::Timestamp(now + Duration::minutes(i64::from(minutes))),
        ));
    }

    if let Some(rating) = update.rating {
        writes.push(("rating".to_string(), FieldWrite::Value(Value::from(rating))));
    }

    if let Some(review) = &update.review {
        writes.push((
            "review".to_string(),
            FieldWrite::Value(review.clone().map_or(Value::Null, Value::from)),
        ));
    }

    writes.push(("updatedAt".to_string(), FieldWrite::ServerTimestamp));
    writes
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn lifecycle() -> RequestLifecycle {
        RequestLifecycle::new(Arc::new(MemoryStore::new()), AssignmentPolicy::KeepStatus)
    }

    fn create_input() -> CreateRequestInput {
        serde_json::from_value(json!({
            "serviceType": "بطارية متنقلة",
            "carModel": "Hilux",
            "notes": "battery dead",
            "latitude": 21.5,
            "longitude": 39.2,
            "price": 80
        }))
        .unwrap()
    }

    fn update_input(body: Value) -> UpdateRequestInput {
        serde_json::from_value(body).unwrap()
    }

    fn id_of(record: &RequestRecord) -> String {
        record["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_starts_unassigned_in_new() {
        let manager = lifecycle();
        let created = manager.create(create_input()).await.unwrap();

        assert_eq!(created["status"], "new");
        assert_eq!(created["plateNumber"], "");
        assert_eq!(created["price"], json!(80.0));
        assert!(!created.contains_key("technicianId"));
        assert!(created["createdAt"].is_string());
    }

    #[tokio::test]
    async fn invalid_status_leaves_record_untouched() {
        let manager = lifecycle();
        let id = id_of(&manager.create(create_input()).await.unwrap());
        let before = manager.get(&id).await.unwrap();

        let err = manager
            .update(&id, update_input(json!({ "status": "archived" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(manager.get(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn unassigning_removes_the_field() {
        let manager = lifecycle();
        let id = id_of(&manager.create(create_input()).await.unwrap());

        manager
            .update(&id, update_input(json!({ "technicianId": "tech-1" })))
            .await
            .unwrap();
        let assigned = manager.get(&id).await.unwrap();
        assert_eq!(assigned["technicianId"], "tech-1");
        assert_eq!(assigned["status"], "new");

        manager
            .update(&id, update_input(json!({ "technicianId": null })))
            .await
            .unwrap();
        assert!(!manager.get(&id).await.unwrap().contains_key("technicianId"));
    }

    #[tokio::test]
    async fn start_on_assign_policy_moves_status() {
        let manager = RequestLifecycle::new(
            Arc::new(MemoryStore::new()),
            AssignmentPolicy::StartOnAssign,
        );
        let first = id_of(&manager.create(create_input()).await.unwrap());
        let second = id_of(&manager.create(create_input()).await.unwrap());

        manager
            .update(&first, update_input(json!({ "technicianId": "tech-1" })))
            .await
            .unwrap();
        assert_eq!(manager.get(&first).await.unwrap()["status"], "in_progress");

        manager
            .update(
                &second,
                update_input(json!({ "technicianId": "tech-1", "status": "cancelled" })),
            )
            .await
            .unwrap();
        assert_eq!(manager.get(&second).await.unwrap()["status"], "cancelled");
    }

    #[tokio::test]
    async fn arrival_estimate_is_anchored_to_update_time() {
        let manager = lifecycle();
        let id = id_of(&manager.create(create_input()).await.unwrap());

        let before = Utc::now();
        manager
            .update(&id, update_input(json!({ "estimatedArrivalMinutes": 15 })))
            .await
            .unwrap();
        let after = Utc::now();

        let record = manager.get(&id).await.unwrap();
        assert_eq!(record[ETA_MINUTES], json!(15));

        let eta: DateTime<Utc> = record[ETA_TIMESTAMP]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        let slack = Duration::seconds(1);
        assert!(eta >= before + Duration::minutes(15) - slack);
        assert!(eta <= after + Duration::minutes(15) + slack);
    }

    #[tokio::test]
    async fn rating_and_review_round_trip() {
        let manager = lifecycle();
        let id = id_of(&manager.create(create_input()).await.unwrap());

        manager
            .update(
                &id,
                update_input(json!({ "status": "completed", "rating": 3, "review": "" })),
            )
            .await
            .unwrap();

        let record = manager.get(&id).await.unwrap();
        assert_eq!(record["rating"], json!(3));
        assert!(record["review"].is_null());
        assert!(record.contains_key("review"));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let manager = lifecycle();
        let err = manager
            .update("missing", update_input(json!({ "status": "completed" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_checks_literal_ids_then_existence() {
        let manager = lifecycle();
        assert!(matches!(
            manager.delete("undefined").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.delete("null").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            manager.delete("nope").await,
            Err(AppError::NotFound(_))
        ));

        let id = id_of(&manager.create(create_input()).await.unwrap());
        manager.delete(&id).await.unwrap();
        assert!(matches!(manager.get(&id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let manager = lifecycle();
        let older = id_of(&manager.create(create_input()).await.unwrap());
        let newer = id_of(&manager.create(create_input()).await.unwrap());

        let ids: Vec<String> = manager.list().await.unwrap().iter().map(id_of).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let manager = lifecycle();
        assert_eq!(manager.delete_all().await.unwrap(), 0);

        manager.create(create_input()).await.unwrap();
        manager.create(create_input()).await.unwrap();
        assert_eq!(manager.delete_all().await.unwrap(), 2);
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verification_read_does_not_change_the_outcome() {
        let manager = lifecycle().with_write_verification(true);
        let id = id_of(&manager.create(create_input()).await.unwrap());

        manager
            .update(&id, update_input(json!({ "status": "in_progress" })))
            .await
            .unwrap();
        assert_eq!(manager.get(&id).await.unwrap()["status"], "in_progress");
    }
}
