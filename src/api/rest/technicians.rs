use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde_json::{json, Value};

use super::json_body;
use crate::engine::ratings::TechnicianRating;
use crate::error::AppError;
use crate::models::technician::{CreateTechnicianInput, LoginInput, Technician};
use crate::observability::metrics::outcome;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/technicians", post(create_technician).get(list_technicians))
        .route("/technicians/ratings", get(technician_ratings))
        .route("/technicians/:id", delete(delete_technician))
        .route("/technician-login", post(login))
}

async fn create_technician(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTechnicianInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let result = match json_body(payload) {
        Ok(input) => state.technicians.create(input).await,
        Err(err) => Err(err),
    };
    state.metrics.record("create_technician", &result);
    let id = result?;

    Ok(Json(json!({
        "success": true,
        "message": "Technician added",
        "id": id
    })))
}

async fn list_technicians(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Technician>>, AppError> {
    let technicians = state.technicians.list().await?;
    Ok(Json(technicians))
}

async fn technician_ratings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, TechnicianRating>>, AppError> {
    let ratings = state.ratings.technician_ratings().await?;
    Ok(Json(ratings))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    // A body that does not parse is a failed login, not a validation error.
    let input = payload.map(|Json(input)| input).unwrap_or_default();
    let result = state.technicians.login(input).await;
    state
        .metrics
        .technician_logins_total
        .with_label_values(&[outcome(&result)])
        .inc();
    let technician = result?;

    Ok(Json(json!({
        "success": true,
        "id": technician.id,
        "name": technician.name
    })))
}

async fn delete_technician(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = state.technicians.delete(&id).await;
    state.metrics.record("delete_technician", &result);
    result?;

    Ok(Json(json!({
        "success": true,
        "message": "Technician deleted successfully"
    })))
}
