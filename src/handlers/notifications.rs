use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateNotificationPayload, NotificationListResponse};
use crate::services::NotificationDispatcher;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub account_id: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub account_id: String,
}

/// GET /api/notifications
pub async fn list_notifications(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(10).clamp(1, 100);

    let (notifications, total) = dispatcher
        .list_for_account(&query.account_id, page, page_size, query.category.as_deref())
        .await?;
    let unread_count = dispatcher.unread_count(&query.account_id).await?;

    Ok(HttpResponse::Ok().json(NotificationListResponse {
        notifications,
        total,
        page,
        page_size,
        unread_count,
    }))
}

/// POST /api/notifications
pub async fn create_notification(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    payload: web::Json<CreateNotificationPayload>,
) -> Result<HttpResponse, AppError> {
    let notification = dispatcher
        .publish(payload.into_inner().into_notification())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "notification": notification,
    })))
}

/// GET /api/notifications/{id}
pub async fn get_notification(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    match dispatcher.get(path.into_inner()).await? {
        Some(notification) => Ok(HttpResponse::Ok().json(notification)),
        None => Err(AppError::NotFound),
    }
}

/// PUT /api/notifications/{id}/read
pub async fn mark_as_read(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    path: web::Path<Uuid>,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse, AppError> {
    match dispatcher
        .mark_read(path.into_inner(), &query.account_id)
        .await?
    {
        Some(unread_count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "unread_count": unread_count,
        }))),
        None => Err(AppError::NotFound),
    }
}

/// PUT /api/notifications/read-all
pub async fn mark_all_as_read(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse, AppError> {
    let (read_count, unread_count) = dispatcher.mark_all_read(&query.account_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "read_count": read_count,
        "unread_count": unread_count,
    })))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    dispatcher: web::Data<Arc<NotificationDispatcher>>,
    path: web::Path<Uuid>,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse, AppError> {
    if !dispatcher
        .delete(path.into_inner(), &query.account_id)
        .await?
    {
        return Err(AppError::NotFound);
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Register routes
///
/// `read-all` must precede the `{id}` routes so it is not captured as an id.
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/notifications")
            .route("", web::get().to(list_notifications))
            .route("", web::post().to(create_notification))
            .route("/read-all", web::put().to(mark_all_as_read))
            .route("/{id}", web::get().to(get_notification))
            .route("/{id}", web::delete().to(delete_notification))
            .route("/{id}/read", web::put().to(mark_as_read)),
    );
}
