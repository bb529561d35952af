use std::sync::Arc;

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde_json::json;

use crate::services::NotificationDispatcher;
use crate::websocket::{ConnectionRegistry, WsSession};

/// GET /api/notifications/ws/{account_id}
///
/// Upgrades to a WebSocket and registers the connection for real-time
/// delivery. The first frame sent is the `connected` envelope carrying the
/// account's current unread count.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    registry: web::Data<ConnectionRegistry>,
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
) -> Result<HttpResponse, Error> {
    let account_id = path.into_inner();

    let unread_count = dispatcher.unread_count(&account_id).await?;
    let (connection_id, receiver) = registry.connect(&account_id).await;

    let session = WsSession::new(
        account_id,
        connection_id,
        registry.get_ref().clone(),
        receiver,
        unread_count,
    );

    ws::start(session, &req, stream)
}

/// GET /api/notifications/ws-status/{account_id}
pub async fn ws_status(
    path: web::Path<String>,
    registry: web::Data<ConnectionRegistry>,
) -> HttpResponse {
    let account_id = path.into_inner();
    let connection_count = registry.connection_count(&account_id).await;

    HttpResponse::Ok().json(json!({
        "account_id": account_id,
        "connected": connection_count > 0,
        "connection_count": connection_count,
    }))
}

/// Register WebSocket routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications/ws")
            .route("/{account_id}", web::get().to(ws_connect)),
    )
    .service(
        web::scope("/api/notifications/ws-status")
            .route("/{account_id}", web::get().to(ws_status)),
    );
}
