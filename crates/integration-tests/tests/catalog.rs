//! Catalog integration tests.
//!
//! Products, colors and stock adjustments through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use stocks_integration_tests::{TestApp, admin_token, employee_token};

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_create_and_fetch_product() {
    let app = TestApp::new();
    let id = app.create_product("  Cotton Yarn ", "KnittingThreads").await;

    let response = app.get(&format!("/api/product/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Cotton Yarn");
    assert_eq!(response.body["category"], "KnittingThreads");
    assert!(response.body.get("colors").is_none());
}

#[tokio::test]
async fn test_product_names_conflict_case_insensitively() {
    let app = TestApp::new();
    app.create_product("Silk Ribbon", "Ribbons").await;

    let response = app
        .post(
            "/api/product",
            Some(&admin_token()),
            json!({ "name": "SILK RIBBON", "category": "Laces" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.body["message"],
        "Product with the same name already exists."
    );
}

#[tokio::test]
async fn test_invalid_product_reports_every_field() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/product",
            Some(&admin_token()),
            json!({ "name": "X", "category": "Hats" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_fields(), ["name", "category"]);

    let listing = app.get("/api/products", Some(&employee_token())).await;
    assert_eq!(listing.body["items"], json!([]));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .send(
            axum::http::Method::POST,
            "/api/product",
            Some(&admin_token()),
            Some(json!("not an object")),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["message"].is_string());
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let app = TestApp::new();
    let id = "3f2b8c1e-9d4a-4b6f-8e2c-5a7d9f1b3c4e";
    let response = app.get(&format!("/api/product/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body["message"],
        format!("Product with ID {id} not found.")
    );
}

#[tokio::test]
async fn test_bad_product_id_is_bad_request() {
    let app = TestApp::new();
    let response = app.get("/api/product/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_to_existing_name_conflicts() {
    let app = TestApp::new();
    app.create_product("Brass Zipper", "Zippers").await;
    let id = app.create_product("Nylon Zipper", "Zippers").await;

    let response = app
        .put(
            &format!("/api/product/{id}"),
            Some(&admin_token()),
            json!({ "name": "brass zipper", "category": "Zippers" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Keeping its own name is not a conflict
    let response = app
        .put(
            &format!("/api/product/{id}"),
            Some(&admin_token()),
            json!({ "name": "NYLON ZIPPER", "category": "Zippers" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "NYLON ZIPPER");
}

#[tokio::test]
async fn test_delete_product_cascades() {
    let app = TestApp::new();
    let id = app.create_product("Lace Trim", "Laces").await;
    app.add_color(&id, "WHITE", 4).await;
    app.add_color(&id, "IVORY", 2).await;

    let response = app
        .delete(&format!("/api/product/{id}"), Some(&admin_token()))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/product/{id}"), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listing = app.get("/api/products", Some(&employee_token())).await;
    assert_eq!(listing.body["items"], json!([]));

    let response = app
        .delete(&format!("/api/product/{id}"), Some(&admin_token()))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Colors
// =============================================================================

#[tokio::test]
async fn test_duplicate_color_code_conflicts_within_product_only() {
    let app = TestApp::new();
    let yarn = app.create_product("Cotton Yarn", "KnittingThreads").await;
    let wool = app.create_product("Merino Wool", "KnittingThreads").await;
    app.add_color(&yarn, "RED01", 5).await;

    let response = app
        .post(
            &format!("/api/product/{yarn}/colors"),
            Some(&admin_token()),
            json!({ "code": "red01", "existingQuantity": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.body["message"],
        "Color with code 'red01' already exists for this product."
    );

    // Same code on another product is fine
    app.add_color(&wool, "RED01", 3).await;
}

#[tokio::test]
async fn test_invalid_color_is_rejected() {
    let app = TestApp::new();
    let id = app.create_product("Cotton Yarn", "KnittingThreads").await;

    let response = app
        .post(
            &format!("/api/product/{id}/colors"),
            Some(&admin_token()),
            json!({ "code": "RED-01", "existingQuantity": -1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_fields(), ["code", "existingQuantity"]);
}

#[tokio::test]
async fn test_delete_color() {
    let app = TestApp::new();
    let id = app.create_product("Cotton Yarn", "KnittingThreads").await;
    let red = app.add_color(&id, "RED01", 5).await;
    let blue = app.add_color(&id, "BLUE", 5).await;

    let response = app
        .delete(&format!("/api/product/{id}/colors/{red}"), Some(&admin_token()))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let product = app
        .get(&format!("/api/product/{id}?includeColors=true"), None)
        .await;
    let colors = product.body["colors"].as_array().unwrap();
    assert_eq!(colors.len(), 1);
    assert_eq!(colors[0]["colorId"], blue.as_str());

    let response = app
        .delete(&format!("/api/product/{id}/colors/{red}"), Some(&admin_token()))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body["message"],
        format!("Color with ID {red} not found for product Cotton Yarn.")
    );
}

// =============================================================================
// Stock adjustments
// =============================================================================

#[tokio::test]
async fn test_stock_adjustment_adds_and_clamps_at_zero() {
    let app = TestApp::new();
    let id = app.create_product("Cotton Yarn", "KnittingThreads").await;
    let color = app.add_color(&id, "RED01", 5).await;

    let response = app
        .put(
            &format!("/api/product/{id}"),
            Some(&admin_token()),
            json!({
                "name": "Cotton Yarn",
                "category": "KnittingThreads",
                "colorId": color,
                "quantityToAdd": 7,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["color"]["stockCount"], 12);

    let response = app
        .put(
            &format!("/api/product/{id}"),
            Some(&admin_token()),
            json!({
                "name": "Cotton Yarn",
                "category": "KnittingThreads",
                "colorId": color,
                "quantityToAdd": -50,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.stock_of(&id, &color).await, 0);
}

#[tokio::test]
async fn test_stock_adjustment_needs_a_color() {
    let app = TestApp::new();
    let id = app.create_product("Cotton Yarn", "KnittingThreads").await;

    let response = app
        .put(
            &format!("/api/product/{id}"),
            Some(&admin_token()),
            json!({ "name": "Cotton Yarn", "category": "KnittingThreads", "quantityToAdd": 3 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_fields(), ["colorId"]);
}

#[tokio::test]
async fn test_stock_adjustment_on_foreign_color_is_not_found() {
    let app = TestApp::new();
    let yarn = app.create_product("Cotton Yarn", "KnittingThreads").await;
    let wool = app.create_product("Merino Wool", "KnittingThreads").await;
    let wool_red = app.add_color(&wool, "RED01", 5).await;

    let response = app
        .put(
            &format!("/api/product/{yarn}"),
            Some(&admin_token()),
            json!({
                "name": "Renamed Yarn",
                "category": "KnittingThreads",
                "colorId": wool_red,
                "quantityToAdd": 1,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Nothing was written
    let product = app.get(&format!("/api/product/{yarn}"), None).await;
    assert_eq!(product.body["name"], "Cotton Yarn");
    assert_eq!(app.stock_of(&wool, &wool_red).await, 5);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_listing_has_one_row_per_color() {
    let app = TestApp::new();
    let yarn = app.create_product("Cotton Yarn", "KnittingThreads").await;
    app.add_color(&yarn, "RED01", 5).await;
    app.add_color(&yarn, "BLUE", 2).await;
    let zipper = app.create_product("Brass Zipper", "Zippers").await;

    let listing = app.get("/api/products", Some(&employee_token())).await;
    assert_eq!(listing.status, StatusCode::OK);
    let items = listing.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    let yarn_rows: Vec<_> = items
        .iter()
        .filter(|row| row["productId"] == yarn.as_str())
        .collect();
    assert_eq!(yarn_rows.len(), 2);
    assert!(yarn_rows.iter().all(|row| row["colorId"].is_string()));

    let zipper_row = items
        .iter()
        .find(|row| row["productId"] == zipper.as_str())
        .unwrap();
    assert!(zipper_row["colorId"].is_null());
    assert!(zipper_row["colorCode"].is_null());
    assert_eq!(zipper_row["stockCount"], 0);
}
