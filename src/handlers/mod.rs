/// HTTP handlers for the notification API
pub mod notifications;
pub mod websocket;

use actix_web::{web, HttpResponse};
use serde_json::json;
use tokio::sync::watch;

use crate::services::ConsumerState;
use crate::websocket::ConnectionRegistry;

pub use notifications::register_routes as register_notifications;
pub use websocket::register_routes as register_websocket;

/// GET /health
pub async fn health(
    registry: web::Data<ConnectionRegistry>,
    consumer_state: web::Data<watch::Receiver<ConsumerState>>,
) -> HttpResponse {
    let total_connections = registry.total_connections().await;
    let state = *consumer_state.borrow();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "omni-notification-service",
        "event_consumer": state.as_str(),
        "websocket_connections": total_connections,
    }))
}
