//! Product catalogue endpoints: CRUD, search, filters and validation.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_product_returns_201_with_envelope() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/products",
            Some(json!({
                "sku": "BOLT-M6-40",
                "name": "Hex bolt M6x40",
                "category": "Fasteners",
                "quantity": 120,
                "reorder_level": 25,
                "price": "0.18",
                "location": "A1-01"
            })),
        )
        .await;

    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Product created");
    assert_eq!(body["data"]["sku"], "BOLT-M6-40");
    assert_eq!(body["data"]["quantity"], 120);
    assert_eq!(body["data"]["reorder_level"], 25);
    assert_eq!(body["data"]["category"], "Fasteners");
}

#[tokio::test]
async fn reorder_level_defaults_to_ten() {
    let app = TestApp::new().await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/products",
            Some(json!({ "sku": "TAPE-5M", "name": "Measuring tape", "price": 9.99 })),
        )
        .await;

    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["reorder_level"], 10);
    assert_eq!(body["data"]["quantity"], 0);
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = TestApp::new().await;
    app.create_product("DUP-1", 5, 1).await;

    let response = app
        .as_manager(
            Method::POST,
            "/api/products",
            Some(json!({ "sku": "DUP-1", "name": "Again", "price": "1.00" })),
        )
        .await;

    assert_eq!(response.status(), 409);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn invalid_product_fields_are_rejected() {
    let app = TestApp::new().await;

    for payload in [
        json!({ "sku": "", "name": "No sku", "price": "1.00" }),
        json!({ "sku": "has space", "name": "Bad sku", "price": "1.00" }),
        json!({ "sku": "NEG-PRICE", "name": "Negative", "price": "-1.00" }),
        json!({ "sku": "PRECISE", "name": "Too precise", "price": "1.005" }),
        json!({ "sku": "NEG-QTY", "name": "Negative qty", "price": "1.00", "quantity": -3 }),
        json!({ "sku": "NO-NAME", "name": "", "price": "1.00" }),
    ] {
        let response = app
            .as_manager(Method::POST, "/api/products", Some(payload.clone()))
            .await;
        assert_eq!(response.status(), 400, "payload {payload} should be rejected");
        let body = response_json(response).await;
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn get_product_by_id_and_sku() {
    let app = TestApp::new().await;
    let id = app.create_product("DRL-HSS-6", 42, 10).await;

    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["sku"], "DRL-HSS-6");

    let response = app
        .as_staff(Method::GET, "/api/products/sku/DRL-HSS-6", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["id"], id);

    let response = app.as_staff(Method::GET, "/api/products/9999", None).await;
    assert_eq!(response.status(), 404);
    let response = app
        .as_staff(Method::GET, "/api/products/sku/NOPE", None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn list_supports_search_category_and_pagination() {
    let app = TestApp::new().await;
    for i in 0..5 {
        app.create_product(&format!("WIDGET-{i}"), 50, 5).await;
    }
    app.as_manager(
        Method::POST,
        "/api/products",
        Some(json!({ "sku": "GLV-NIT-L", "name": "Nitrile gloves", "category": "Safety", "price": "12.40" })),
    )
    .await;

    let response = app
        .as_staff(Method::GET, "/api/products?page=1&limit=2", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 6);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total_pages"], 3);
    assert_eq!(body["data"]["limit"], 2);

    let response = app
        .as_staff(Method::GET, "/api/products?search=Nitrile", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["sku"], "GLV-NIT-L");

    // search ignores case in both the term and the stored values
    let response = app
        .as_staff(Method::GET, "/api/products?search=nitrile%20GLOVES", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    let response = app
        .as_staff(Method::GET, "/api/products?search=glv-nit", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"][0]["sku"], "GLV-NIT-L");

    let response = app
        .as_staff(Method::GET, "/api/products?category=Safety", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);

    let response = app
        .as_staff(
            Method::GET,
            "/api/products?sort_by=sku&sort_order=desc&limit=1",
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["items"][0]["sku"], "WIDGET-4");
}

#[tokio::test]
async fn pages_far_past_the_end_are_empty() {
    let app = TestApp::new().await;
    app.create_product("FAR-1", 1, 0).await;

    for uri in [
        "/api/products?page=18446744073709551615&limit=2",
        "/api/products?page=9223372036854775807",
        "/api/audit?page=18446744073709551615&limit=100",
    ] {
        let response = app.as_staff(Method::GET, uri, None).await;
        assert_eq!(response.status(), 200, "{uri}");
        let body = response_json(response).await;
        assert_eq!(body["data"]["total"], 1, "{uri}");
        assert!(body["data"]["items"].as_array().unwrap().is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn page_size_is_clamped_to_the_configured_maximum() {
    let app = TestApp::with_config(|cfg| cfg.max_page_size = 3).await;
    for i in 0..4 {
        app.create_product(&format!("CLAMP-{i}"), 1, 0).await;
    }

    let response = app
        .as_staff(Method::GET, "/api/products?limit=500", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["limit"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn low_stock_listing_and_categories() {
    let app = TestApp::new().await;
    app.create_product("PLENTY", 100, 10).await;
    app.create_product("LOW", 3, 10).await;
    app.create_product("EXACT", 10, 10).await;

    let response = app
        .as_staff(Method::GET, "/api/products/low-stock", None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let skus: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sku"].as_str().unwrap())
        .collect();
    assert!(skus.contains(&"LOW"));
    assert!(skus.contains(&"EXACT"));
    assert!(!skus.contains(&"PLENTY"));

    let response = app
        .as_staff(Method::GET, "/api/products?low_stock=true", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);

    let response = app
        .as_staff(Method::GET, "/api/products/categories", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"], json!(["Hardware"]));
}

#[tokio::test]
async fn update_changes_descriptive_fields_only() {
    let app = TestApp::new().await;
    let id = app.create_product("UPD-1", 20, 5).await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(json!({ "name": "Renamed", "location": "Z9" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["location"], "Z9");
    assert_eq!(body["data"]["quantity"], 20);

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(json!({ "quantity": 500 })),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .as_manager(
            Method::PUT,
            "/api/products/4242",
            Some(json!({ "name": "Ghost" })),
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn update_rejects_sku_taken_by_another_product() {
    let app = TestApp::new().await;
    app.create_product("TAKEN", 1, 0).await;
    let id = app.create_product("FREE", 1, 0).await;

    let response = app
        .as_manager(
            Method::PUT,
            &format!("/api/products/{id}"),
            Some(json!({ "sku": "TAKEN" })),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn delete_removes_product_with_history() {
    let app = TestApp::new().await;
    let id = app.create_product("GONE", 2, 5).await;

    let response = app
        .as_manager(Method::DELETE, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .as_staff(Method::GET, &format!("/api/audit?product_id={id}"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    let response = app
        .as_staff(
            Method::GET,
            &format!("/api/notifications?product_id={id}"),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    let response = app
        .as_manager(Method::DELETE, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn opening_stock_is_audited() {
    let app = TestApp::new().await;
    let id = app.create_product("OPEN-1", 30, 5).await;

    let response = app
        .as_staff(Method::GET, &format!("/api/products/{id}/history"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    let entry = &body["data"]["items"][0];
    assert_eq!(entry["operation_type"], "initial_stock");
    assert_eq!(entry["old_quantity"], 0);
    assert_eq!(entry["new_quantity"], 30);
    assert_eq!(entry["user_id"], app.manager_id);

    let empty = app.create_product("OPEN-0", 0, 5).await;
    let response = app
        .as_staff(Method::GET, &format!("/api/products/{empty}/history"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 0);

    let response = app
        .as_staff(Method::GET, "/api/products/777/history", None)
        .await;
    assert_eq!(response.status(), 404);
}
