use std::sync::Arc;

use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::models::catalog::{price_text, ServiceOffering, CATALOG};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/services", get(list_services))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceListing {
    #[serde(flatten)]
    offering: ServiceOffering,
    is_variable: bool,
    price_text: String,
}

async fn list_services() -> Json<Vec<ServiceListing>> {
    let listings = CATALOG
        .iter()
        .map(|offering| ServiceListing {
            offering: *offering,
            is_variable: offering.is_variable(),
            price_text: price_text(offering.service_type, None),
        })
        .collect();

    Json(listings)
}
