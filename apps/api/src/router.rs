use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use appointment_cell::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/v1/appointments", appointment_routes(state))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "appointment-service",
    }))
}
