//! HTTP ingress for bucket notifications.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::event::StorageEvent;
use crate::pipeline::intake::IntakeController;

/// Build the Axum router with the event webhook and health check.
pub fn relay_routes(controller: Arc<IntakeController>) -> Router {
    Router::new()
        .route("/events", post(receive_event))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "robin-relay"
    }))
}

/// Run the event through the relay; the HTTP status mirrors `statusCode`.
async fn receive_event(
    State(controller): State<Arc<IntakeController>>,
    Json(event): Json<StorageEvent>,
) -> impl IntoResponse {
    let response = controller.handle(&event).await;
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        warn!(status = response.status_code, body = %response.body, "Event handled with failures");
    }
    (status, Json(response))
}
