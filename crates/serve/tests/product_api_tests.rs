//! Integration tests for health, product and stats endpoints

mod common;

use axum::http::StatusCode;
use common::{get, post, product_json, router, send, StubEngine};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_engine_state() {
    let (status, body) = get(router(Arc::new(StubEngine::default())), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["engine"], true);

    let (status, body) = get(router(Arc::new(StubEngine::failing())), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_create_and_fetch_product() {
    let engine = Arc::new(StubEngine::default());

    let (status, created) = post(
        router(engine.clone()),
        "/api/products",
        product_json("Wireless Mouse", "Electronics", 24.99),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(created["inStock"], true);

    let (status, fetched) = get(router(engine), &format!("/api/products/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Wireless Mouse");
    assert_eq!(fetched["price"], 24.99);
}

#[tokio::test]
async fn test_create_keeps_supplied_id() {
    let engine = Arc::new(StubEngine::default());
    let mut payload = product_json("Desk Lamp", "Home", 35.0);
    payload["id"] = json!("lamp-1");

    let (status, created) = post(router(engine.clone()), "/api/products", payload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "lamp-1");
    assert!(engine.products.lock().unwrap().contains_key("lamp-1"));
}

#[tokio::test]
async fn test_create_rejects_invalid_product() {
    let engine = Arc::new(StubEngine::default());

    let (status, body) = post(
        router(engine.clone()),
        "/api/products",
        product_json("", "Electronics", 10.0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product name is required");

    let (status, body) = post(
        router(engine.clone()),
        "/api/products",
        product_json("Cable", "Electronics", -1.0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert!(engine.products.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) = post(
        router(Arc::new(StubEngine::default())),
        "/api/products",
        json!({ "name": 42 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let engine = Arc::new(StubEngine::default());

    let (status, body) = get(router(engine.clone()), "/api/products/absent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product absent not found");

    let (status, _) = send(
        router(engine.clone()),
        "PUT",
        "/api/products/absent",
        Some(json!({ "price": 5.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(router(engine), "DELETE", "/api/products/absent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_and_delete_product() {
    let engine = Arc::new(StubEngine::default());
    let mut payload = product_json("Keyboard", "Electronics", 49.0);
    payload["id"] = json!("kb-1");
    post(router(engine.clone()), "/api/products", payload).await;

    let (status, body) = send(
        router(engine.clone()),
        "PUT",
        "/api/products/kb-1",
        Some(json!({ "price": 39.5, "inStock": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": "kb-1", "result": "updated" }));

    {
        let store = engine.products.lock().unwrap();
        let product = &store["kb-1"];
        assert_eq!(product.price, 39.5);
        assert!(!product.in_stock);
        assert!(product.updated_at.is_some());
    }

    let (status, _) = send(
        router(engine.clone()),
        "PUT",
        "/api/products/kb-1",
        Some(json!({ "id": "kb-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(router(engine.clone()), "DELETE", "/api/products/kb-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "deleted");
    assert!(engine.products.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_reports_partial_failure() {
    let engine = Arc::new(StubEngine::default());

    let (status, body) = post(
        router(engine.clone()),
        "/api/products/bulk",
        json!([
            product_json("Mouse", "Electronics", 20.0),
            product_json("Chair", "Furniture", 120.0),
            product_json("Broken", "", 1.0)
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["indexed"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["items"][2]["success"], false);
    assert_eq!(body["items"][2]["error"], "Validation error: Product category is required");
    assert_eq!(engine.products.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_rejects_empty_list() {
    let (status, body) = post(
        router(Arc::new(StubEngine::default())),
        "/api/products/bulk",
        json!([]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "At least one product is required");
}

#[tokio::test]
async fn test_stats() {
    let (status, body) = get(router(Arc::new(StubEngine::default())), "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docCount"], 0);
    assert_eq!(body["sizeMb"], 3.0);
    assert_eq!(body["avgQueryTimeMs"], 2.5);
    assert_eq!(body["avgIndexTimeMs"], 0.0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _) = get(router(Arc::new(StubEngine::default())), "/api/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
