//! Low-stock notifications: creation thresholds, dedup and read state.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::{json, Value};

async fn notifications(app: &TestApp, query: &str) -> Value {
    let response = app
        .as_staff(Method::GET, &format!("/api/notifications{query}"), None)
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}

async fn adjust(app: &TestApp, id: i32, delta: i32) -> Value {
    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": delta, "reason": "Test movement" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}

#[tokio::test]
async fn dropping_to_reorder_level_raises_one_low_stock_notification() {
    let app = TestApp::new().await;
    let id = app.create_product("NOTE-1", 20, 10).await;

    let first = adjust(&app, id, -10).await;
    assert_eq!(first["notification"]["type"], "low_stock");
    assert_eq!(first["notification"]["product_id"], id);
    assert_eq!(first["notification"]["is_read"], false);

    // still low, but an unread low_stock notification already exists
    let second = adjust(&app, id, -2).await;
    assert!(second["notification"].is_null());

    let data = notifications(&app, &format!("?product_id={id}")).await;
    assert_eq!(data["total"], 1);
}

#[tokio::test]
async fn out_of_stock_is_a_separate_notification() {
    let app = TestApp::new().await;
    let id = app.create_product("NOTE-2", 5, 10).await;

    // created below the reorder level
    let data = notifications(&app, &format!("?product_id={id}")).await;
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["type"], "low_stock");

    let sold_out = adjust(&app, id, -5).await;
    assert_eq!(sold_out["notification"]["type"], "out_of_stock");

    let data = notifications(&app, &format!("?product_id={id}&type=out_of_stock")).await;
    assert_eq!(data["total"], 1);
    let data = notifications(&app, &format!("?product_id={id}")).await;
    assert_eq!(data["total"], 2);
}

#[tokio::test]
async fn healthy_stock_raises_nothing() {
    let app = TestApp::new().await;
    let id = app.create_product("NOTE-3", 50, 10).await;

    let result = adjust(&app, id, -39).await;
    assert!(result["notification"].is_null());

    let data = notifications(&app, "").await;
    assert_eq!(data["total"], 0);
}

#[tokio::test]
async fn reading_a_notification_allows_a_new_one() {
    let app = TestApp::new().await;
    let id = app.create_product("NOTE-4", 3, 10).await;

    let data = notifications(&app, "").await;
    let notification_id = data["items"][0]["id"].as_i64().unwrap();

    let response = app
        .as_staff(
            Method::PUT,
            &format!("/api/notifications/{notification_id}/read"),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["is_read"], true);

    let result = adjust(&app, id, -1).await;
    assert_eq!(result["notification"]["type"], "low_stock");

    let unread = notifications(&app, "?is_read=false").await;
    assert_eq!(unread["total"], 1);
    let read = notifications(&app, "?is_read=true").await;
    assert_eq!(read["total"], 1);
}

#[tokio::test]
async fn unread_count_and_mark_all_read() {
    let app = TestApp::new().await;
    app.create_product("NOTE-5", 1, 10).await;
    app.create_product("NOTE-6", 0, 10).await;
    app.create_product("NOTE-7", 2, 10).await;

    let response = app
        .as_staff(Method::GET, "/api/notifications/unread-count", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["unread"], 3);

    let response = app
        .as_staff(Method::PUT, "/api/notifications/read-all", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["updated"], 3);

    let response = app
        .as_staff(Method::GET, "/api/notifications/unread-count", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["unread"], 0);
}

#[tokio::test]
async fn deleting_notifications_is_manager_only() {
    let app = TestApp::new().await;
    app.create_product("NOTE-8", 1, 10).await;
    let data = notifications(&app, "").await;
    let notification_id = data["items"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/notifications/{notification_id}");

    let response = app.as_staff(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), 403);

    let response = app.as_manager(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), 200);

    let response = app.as_manager(Method::DELETE, &uri, None).await;
    assert_eq!(response.status(), 404);

    let response = app
        .as_staff(Method::PUT, "/api/notifications/999/read", None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn reorder_scan_flags_every_product_at_or_below_reorder_level() {
    let app = TestApp::new().await;
    app.create_product("SCAN-LOW", 4, 10).await;
    app.create_product("SCAN-EDGE", 10, 10).await;
    app.create_product("SCAN-OK", 40, 10).await;

    let response = app
        .as_staff(Method::POST, "/api/notifications/reorder-scan", None)
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .as_manager(Method::POST, "/api/notifications/reorder-scan", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["products_below_reorder_level"], 2);
    assert_eq!(body["data"]["notifications_created"], 2);

    // a second scan finds the unread ones and adds nothing
    let response = app
        .as_manager(Method::POST, "/api/notifications/reorder-scan", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["notifications_created"], 0);

    let data = notifications(&app, "?type=reorder_required").await;
    assert_eq!(data["total"], 2);
}

#[tokio::test]
async fn raising_reorder_level_to_meet_stock_notifies() {
    let app = TestApp::new().await;
    let id = app.create_product("NOTE-9", 8, 5).await;
    assert_eq!(notifications(&app, "").await["total"], 0);

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(json!({ "reorder_level": 8 })),
        )
        .await;
    assert_eq!(response.status(), 200);

    let data = notifications(&app, "").await;
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["type"], "low_stock");
}
