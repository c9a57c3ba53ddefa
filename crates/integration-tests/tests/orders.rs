//! Order integration tests.
//!
//! Placement and stock deduction, the paged listing and order details.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use stocks_integration_tests::{TestApp, TestResponse, employee_token, order_line, token};

/// Product "Cotton Yarn" with color RED01 holding `stock` units.
async fn yarn_with_stock(app: &TestApp, stock: i32) -> (String, String) {
    let product = app.create_product("Cotton Yarn", "KnittingThreads").await;
    let color = app.add_color(&product, "RED01", stock).await;
    (product, color)
}

fn order(client: &str, lines: Vec<Value>) -> Value {
    json!({ "clientName": client, "items": lines })
}

/// `createdBy` of the order a save response points at.
async fn created_by(app: &TestApp, saved: &TestResponse) -> Value {
    let id = saved.str("orderId");
    let mut details = app
        .get(&format!("/api/orders/{id}"), Some(&employee_token()))
        .await;
    details.body["createdBy"].take()
}

// =============================================================================
// Placement
// =============================================================================

#[tokio::test]
async fn test_order_deducts_stock() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;

    let response = app
        .post(
            "/api/orders",
            None,
            order("Ana", vec![order_line(&product, &color, "Cotton Yarn", "RED01", 3)]),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(
        response.body["message"],
        "Order saved successfully and stock updated"
    );
    assert!(response.body["orderId"].is_string());
    assert_eq!(app.stock_of(&product, &color).await, 7);
}

#[tokio::test]
async fn test_oversold_order_is_accepted_and_zeroes_stock() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 2).await;

    let response = app
        .post(
            "/api/orders",
            None,
            order("Ana", vec![order_line(&product, &color, "Cotton Yarn", "RED01", 5)]),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.stock_of(&product, &color).await, 0);

    // The order keeps the quantity asked for
    let id = response.str("orderId");
    let details = app
        .get(&format!("/api/orders/{id}"), Some(&employee_token()))
        .await;
    assert_eq!(details.body["items"][0]["quantity"], 5);
}

#[tokio::test]
async fn test_repeated_lines_for_one_color_compound() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;

    let response = app
        .post(
            "/api/orders",
            None,
            order(
                "Ana",
                vec![
                    order_line(&product, &color, "Cotton Yarn", "RED01", 4),
                    order_line(&product, &color, "Cotton Yarn", "RED01", 4),
                ],
            ),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.stock_of(&product, &color).await, 2);
}

#[tokio::test]
async fn test_invalid_order_persists_nothing() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;

    let mut bad = order_line(&product, &color, "Cotton Yarn", "RED01", 1);
    bad["category"] = json!("Hats");
    let response = app
        .post(
            "/api/orders",
            None,
            order(
                "Ana",
                vec![order_line(&product, &color, "Cotton Yarn", "RED01", 3), bad],
            ),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_fields(), ["items[1].category"]);
    assert_eq!(app.stock_of(&product, &color).await, 10);

    let listing = app.get("/api/orders", Some(&employee_token())).await;
    assert_eq!(listing.body["totalCount"], 0);
}

#[tokio::test]
async fn test_order_for_unknown_color_fails_whole_order() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;
    let missing = "9c1d2e3f-4a5b-4c6d-8e7f-0a1b2c3d4e5f";

    let response = app
        .post(
            "/api/orders",
            None,
            order(
                "Ana",
                vec![
                    order_line(&product, &color, "Cotton Yarn", "RED01", 3),
                    order_line(&product, missing, "Cotton Yarn", "GONE", 1),
                ],
            ),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(&product, &color).await, 10);
}

#[tokio::test]
async fn test_order_without_items_is_rejected() {
    let app = TestApp::new();
    let response = app.post("/api/orders", None, order("Ana", Vec::new())).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_fields(), ["items"]);
}

// =============================================================================
// Creator
// =============================================================================

#[tokio::test]
async fn test_created_by_records_the_caller() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;
    let line = || order_line(&product, &color, "Cotton Yarn", "RED01", 1);

    let named = app
        .post(
            "/api/orders",
            Some(&token("auth0|7", Some("Mira"), &[])),
            order("Named", vec![line()]),
        )
        .await;
    let unnamed = app
        .post(
            "/api/orders",
            Some(&token("auth0|8", None, &[])),
            order("Unnamed", vec![line()]),
        )
        .await;
    let anonymous = app.post("/api/orders", None, order("Anon", vec![line()])).await;

    assert_eq!(created_by(&app, &named).await, "Mira");
    assert_eq!(created_by(&app, &unnamed).await, "auth0|8");
    assert!(created_by(&app, &anonymous).await.is_null());
}

// =============================================================================
// Listing and details
// =============================================================================

#[tokio::test]
async fn test_order_listing_is_newest_first_and_paged() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 100).await;

    for client in ["First", "Second", "Third"] {
        let response = app
            .post(
                "/api/orders",
                None,
                order(client, vec![order_line(&product, &color, "Cotton Yarn", "RED01", 1)]),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let page = app
        .get("/api/orders?pageNumber=1&pageSize=2", Some(&employee_token()))
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["totalCount"], 3);
    assert_eq!(page.body["totalPages"], 2);
    let clients: Vec<_> = page.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["clientName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(clients, ["Third", "Second"]);

    let page = app
        .get("/api/orders?pageNumber=2&pageSize=2", Some(&employee_token()))
        .await;
    assert_eq!(page.body["items"][0]["clientName"], "First");
}

#[tokio::test]
async fn test_paging_parameters_are_clamped() {
    let app = TestApp::new();

    let page = app
        .get("/api/orders?pageNumber=0&pageSize=500", Some(&employee_token()))
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["pageNumber"], 1);
    assert_eq!(page.body["pageSize"], 100);
    assert_eq!(page.body["totalCount"], 0);
    assert_eq!(page.body["totalPages"], 0);

    let page = app.get("/api/orders", Some(&employee_token())).await;
    assert_eq!(page.body["pageNumber"], 1);
    assert_eq!(page.body["pageSize"], 10);
}

#[tokio::test]
async fn test_order_details() {
    let app = TestApp::new();
    let (product, color) = yarn_with_stock(&app, 10).await;

    let saved = app
        .post(
            "/api/orders",
            None,
            order("Ana", vec![order_line(&product, &color, "Cotton Yarn", "RED01", 2)]),
        )
        .await;
    let id = saved.str("orderId");

    let details = app
        .get(&format!("/api/orders/{id}"), Some(&employee_token()))
        .await;
    assert_eq!(details.status, StatusCode::OK);
    assert_eq!(details.body["orderId"], id.as_str());
    assert_eq!(details.body["clientName"], "Ana");
    let item = &details.body["items"][0];
    assert_eq!(item["productId"], product.as_str());
    assert_eq!(item["colorId"], color.as_str());
    assert_eq!(item["productName"], "Cotton Yarn");
    assert_eq!(item["category"], "KnittingThreads");
    assert_eq!(item["colorCode"], "RED01");
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = TestApp::new();
    let id = "1b2c3d4e-5f6a-4b7c-8d9e-0f1a2b3c4d5e";
    let response = app
        .get(&format!("/api/orders/{id}"), Some(&employee_token()))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body["message"],
        format!("Order with ID {id} not found.")
    );
}
