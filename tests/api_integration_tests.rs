/// HTTP API tests against the in-memory store
///
/// Exercises the REST surface through actix's test harness: create, list,
/// mark read, mark all read, delete, and the not-found signaling on
/// unknown ids.
use std::sync::Arc;

use actix_web::{test, web, App};
use serde_json::{json, Value};
use uuid::Uuid;

use omni_notification_service::handlers;
use omni_notification_service::models::Notification;
use omni_notification_service::services::NotificationDispatcher;
use omni_notification_service::store::{MemoryNotificationStore, NotificationStore};
use omni_notification_service::websocket::ConnectionRegistry;

fn components() -> (ConnectionRegistry, Arc<NotificationDispatcher>) {
    let registry = ConnectionRegistry::new();
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(store, registry.clone()));
    (registry, dispatcher)
}

macro_rules! test_app {
    ($registry:expr, $dispatcher:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($registry.clone()))
                .app_data(web::Data::new($dispatcher.clone()))
                .configure(handlers::register_websocket)
                .configure(handlers::register_notifications),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_create_then_get_then_mark_read() {
    let (registry, dispatcher) = components();
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::post()
        .uri("/api/notifications")
        .set_json(json!({
            "account_id": "acct-1",
            "label": "Welcome",
            "content": "This is a test notification",
            "category": "test",
        }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["success"], true);
    let id = created["notification"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/notifications/{}", id))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["label"], "Welcome");
    assert_eq!(fetched["is_read"], false);

    let req = test::TestRequest::put()
        .uri(&format!("/api/notifications/{}/read?account_id=acct-1", id))
        .to_request();
    let marked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(marked["success"], true);
    assert_eq!(marked["unread_count"], 0);
}

#[actix_rt::test]
async fn test_list_reports_unfiltered_total_and_unread() {
    let (registry, dispatcher) = components();
    for i in 0..3 {
        dispatcher
            .publish(Notification::new("acct-1", format!("n{}", i), "body"))
            .await
            .unwrap();
    }
    dispatcher
        .publish(Notification::new("acct-2", "other", "body"))
        .await
        .unwrap();
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::get()
        .uri("/api/notifications?account_id=acct-1&page=1&page_size=2")
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(listed["total"], 3);
    assert_eq!(listed["unread_count"], 3);
    assert_eq!(listed["page"], 1);
    assert_eq!(listed["page_size"], 2);
    assert_eq!(listed["notifications"].as_array().unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_category_filter_keeps_unfiltered_total() {
    let (registry, dispatcher) = components();
    dispatcher
        .publish(Notification::new("acct-1", "tested", "body").with_category("test"))
        .await
        .unwrap();
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::get()
        .uri("/api/notifications?account_id=acct-1&category=missing-category")
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(listed["total"], 1);
    assert_eq!(listed["notifications"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_read_all_marks_everything() {
    let (registry, dispatcher) = components();
    for i in 0..2 {
        dispatcher
            .publish(Notification::new("acct-1", format!("n{}", i), "body"))
            .await
            .unwrap();
    }
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::put()
        .uri("/api/notifications/read-all?account_id=acct-1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["read_count"], 2);
    assert_eq!(body["unread_count"], 0);
}

#[actix_rt::test]
async fn test_delete_then_not_found() {
    let (registry, dispatcher) = components();
    let notification = Notification::new("acct-1", "doomed", "body");
    let id = notification.id;
    dispatcher.publish(notification).await.unwrap();
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/notifications/{}?account_id=acct-1", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/notifications/{}?account_id=acct-1", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
async fn test_unknown_id_yields_explicit_not_found() {
    let (registry, dispatcher) = components();
    let app = test_app!(registry, dispatcher);
    let id = Uuid::new_v4();

    let req = test::TestRequest::get()
        .uri(&format!("/api/notifications/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::put()
        .uri(&format!("/api/notifications/{}/read?account_id=acct-1", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "notification not found");
}

#[actix_rt::test]
async fn test_ws_status_reports_connection_count() {
    let (registry, dispatcher) = components();
    let app = test_app!(registry, dispatcher);

    let req = test::TestRequest::get()
        .uri("/api/notifications/ws-status/acct-1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["account_id"], "acct-1");
    assert_eq!(body["connected"], false);
    assert_eq!(body["connection_count"], 0);
}
