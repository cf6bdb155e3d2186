//! Stock set/adjust endpoints and the audit rows they write.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::{json, Value};

async fn history(app: &TestApp, id: i32) -> Value {
    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}/history"), None)
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}

#[tokio::test]
async fn staff_can_set_stock_and_the_change_is_audited() {
    let app = TestApp::new().await;
    let id = app.create_product("SET-1", 40, 5).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock"),
            Some(json!({ "quantity": 55, "reason": "Cycle count" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["quantity"], 55);
    assert_eq!(body["data"]["audit"]["old_quantity"], 40);
    assert_eq!(body["data"]["audit"]["new_quantity"], 55);
    assert_eq!(body["data"]["audit"]["operation_type"], "manual_adjustment");
    assert_eq!(body["data"]["audit"]["user_id"], app.staff_id);
    assert_eq!(body["data"]["audit"]["reason"], "Cycle count");
    assert!(body["data"]["notification"].is_null());

    let history = history(&app, id).await;
    assert_eq!(history["total"], 2);
    let latest = &history["items"][0];
    assert_eq!(latest["delta"], 15);
    assert_eq!(latest["username"], "sam");
    assert_eq!(latest["product_sku"], "SET-1");
}

#[tokio::test]
async fn adjust_applies_signed_delta_with_default_operation() {
    let app = TestApp::new().await;
    let id = app.create_product("ADJ-1", 20, 2).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": -5, "reason": "Counter sale" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["quantity"], 15);
    assert_eq!(body["data"]["audit"]["operation_type"], "sale");

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": 10, "reason": "Supplier delivery" })),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["quantity"], 25);
    assert_eq!(body["data"]["audit"]["operation_type"], "restock");

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": -1, "reason": "Dropped on floor", "operation_type": "damage" })),
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["audit"]["operation_type"], "damage");
    assert_eq!(body["data"]["product"]["quantity"], 24);
}

#[tokio::test]
async fn insufficient_stock_leaves_quantity_and_audit_untouched() {
    let app = TestApp::new().await;
    let id = app.create_product("SHORT-1", 4, 1).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": -5, "reason": "Big order" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient stock"));

    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 4);

    let history = history(&app, id).await;
    assert_eq!(history["total"], 1);
}

#[tokio::test]
async fn adjusting_to_exactly_zero_is_allowed() {
    let app = TestApp::new().await;
    let id = app.create_product("ZERO-1", 4, 1).await;

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": -4, "reason": "Sold out" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["quantity"], 0);
    assert_eq!(body["data"]["notification"]["type"], "out_of_stock");
}

#[tokio::test]
async fn invalid_stock_requests_are_rejected() {
    let app = TestApp::new().await;
    let id = app.create_product("BAD-REQ", 10, 1).await;
    let set_uri = format!("/api/products/{id}/stock");
    let adjust_uri = format!("/api/products/{id}/stock/adjust");

    for (uri, payload) in [
        (&set_uri, json!({ "quantity": -1, "reason": "Negative" })),
        (&set_uri, json!({ "quantity": 5, "reason": "no" })),
        (&set_uri, json!({ "quantity": 5, "reason": "   " })),
        (&set_uri, json!({ "quantity": 5, "reason": "x".repeat(501) })),
        (&adjust_uri, json!({ "delta": 0, "reason": "Nothing" })),
    ] {
        let response = app.as_staff(Method::POST, uri, Some(payload.clone())).await;
        assert_eq!(response.status(), 400, "payload {payload} should be rejected");
    }

    let history = history(&app, id).await;
    assert_eq!(history["total"], 1);
}

#[tokio::test]
async fn adjusting_unknown_product_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .as_staff(
            Method::POST,
            "/api/products/404/stock/adjust",
            Some(json!({ "delta": 1, "reason": "Restock" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn stock_endpoints_require_authentication() {
    let app = TestApp::new().await;
    let id = app.create_product("AUTH-1", 10, 1).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/products/{id}/stock"),
            Some(json!({ "quantity": 1, "reason": "Sneaky" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn sequential_adjustments_keep_audit_chain_consistent() {
    let app = TestApp::new().await;
    let id = app.create_product("CHAIN-1", 100, 1).await;

    for delta in [-10, 25, -40, 5, -80] {
        let response = app
            .as_staff(
                Method::POST,
                &format!("/api/products/{id}/stock/adjust"),
                Some(json!({ "delta": delta, "reason": "Chain step" })),
            )
            .await;
        assert_eq!(response.status(), 200, "delta {delta}");
    }

    let history = history(&app, id).await;
    let items = history["items"].as_array().unwrap();
    assert_eq!(items.len(), 6);

    // newest first: each entry starts where the older one ended
    for pair in items.windows(2) {
        assert_eq!(pair[0]["old_quantity"], pair[1]["new_quantity"]);
    }
    assert_eq!(items[0]["new_quantity"], 0);

    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["quantity"], 0);
}

#[tokio::test]
async fn notification_failure_does_not_undo_the_adjustment() {
    use sea_orm::ConnectionTrait;

    let app = TestApp::new().await;
    let id = app.create_product("NOTIFY-DOWN", 20, 5).await;
    app.state
        .db
        .execute_unprepared("DROP TABLE notifications")
        .await
        .unwrap();

    let response = app
        .as_staff(
            Method::POST,
            &format!("/api/products/{id}/stock/adjust"),
            Some(json!({ "delta": -18, "reason": "Large order" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["product"]["quantity"], 2);
    assert_eq!(body["data"]["audit"]["new_quantity"], 2);
    assert!(body["data"]["notification"].is_null());

    let history = history(&app, id).await;
    assert_eq!(history["total"], 2);
    assert_eq!(history["items"][0]["operation_type"], "sale");
    assert_eq!(history["items"][0]["delta"], -18);
}
