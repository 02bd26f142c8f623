use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde_json::{json, Value};

use super::json_body;
use crate::error::AppError;
use crate::models::request::{CreateRequestInput, RequestRecord, UpdateRequestInput};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/new-request", post(create_request))
        .route("/requests", get(list_requests).delete(delete_all_requests))
        .route(
            "/requests/:id",
            get(get_request)
                .patch(update_request)
                .delete(delete_request),
        )
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRequestInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let result = match json_body(payload) {
        Ok(input) => state.requests.create(input).await,
        Err(err) => Err(err),
    };
    state.metrics.record("create_request", &result);
    let record = result?;
    let id = record.get("id").cloned().unwrap_or(Value::Null);

    Ok(Json(json!({
        "success": true,
        "message": "Request submitted successfully",
        "id": id,
        "data": record,
    })))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RequestRecord>>, AppError> {
    let requests = state.requests.list().await?;
    Ok(Json(requests))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let record = state.requests.get(&id).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

async fn update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRequestInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let result = match json_body(payload) {
        Ok(input) => state.requests.update(&id, input).await,
        Err(err) => Err(err),
    };
    state.metrics.record("update_request", &result);
    result?;

    Ok(Json(json!({
        "success": true,
        "message": "Request updated successfully"
    })))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = state.requests.delete(&id).await;
    state.metrics.record("delete_request", &result);
    result?;

    Ok(Json(json!({
        "success": true,
        "message": "Request deleted successfully"
    })))
}

async fn delete_all_requests(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let result = state.requests.delete_all().await;
    state.metrics.record("delete_all_requests", &result);
    let deleted = result?;

    let message = if deleted == 0 {
        "No requests to delete".to_string()
    } else {
        format!("Deleted {deleted} requests")
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "deletedCount": deleted
    })))
}
