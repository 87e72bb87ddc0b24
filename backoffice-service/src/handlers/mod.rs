pub mod clients;
pub mod invoices;
pub mod proposals;
pub mod reports;

use axum::Json;
use serde_json::{json, Value};

use crate::services::metrics;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "backoffice-service",
    }))
}

pub async fn metrics_endpoint() -> String {
    metrics::get_metrics()
}
