//! Integration tests for Stocks.
//!
//! Requests go through the full router (authorization middleware,
//! extractors, handlers) backed by the in-memory store, so no database or
//! identity provider is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stocks-integration-tests
//!
//! # PostgreSQL-backed tests
//! STOCKS_TEST_DATABASE_URL=postgres://... cargo test -p stocks-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Products, colors and stock adjustments
//! - `orders` - Order placement, listing and details
//! - `authorization` - Route requirements and token handling
//! - `postgres_store` - Transactional behavior against a real database

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use stocks_api::AppState;
use stocks_api::config::{AuthConfig, AuthKeys};
use stocks_api::db::MemoryStore;
use stocks_api::routes;
use stocks_api::services::TokenVerifier;

/// HS256 secret the test router accepts.
pub const TEST_SECRET: &str = "k9Qz!4vT#pL2@xW7$mN8^rB1&cH5*dJ3";

/// Response status and decoded body.
///
/// Empty bodies decode to `Value::Null`, non-JSON bodies to a string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// Body field as a string, for ids handed back by create endpoints.
    pub fn str(&self, field: &str) -> String {
        self.body[field]
            .as_str()
            .unwrap_or_else(|| panic!("missing string field {field} in {}", self.body))
            .to_string()
    }

    /// Field names of a validation error response.
    pub fn error_fields(&self) -> Vec<String> {
        self.body["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e["field"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The application router over a fresh in-memory store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let config = AuthConfig {
            keys: AuthKeys::Shared {
                secret: TEST_SECRET.to_string().into(),
                issuer: None,
                audience: None,
            },
            roles_claim: "roles".to_string(),
        };
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            TokenVerifier::new(&config),
        );
        Self {
            router: routes::router(state, None),
        }
    }

    /// Send one request, with an optional bearer token and JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, token, None).await
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Create a product as an admin, returning its id.
    pub async fn create_product(&self, name: &str, category: &str) -> String {
        let response = self
            .post(
                "/api/product",
                Some(&admin_token()),
                json!({ "name": name, "category": category }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.str("id")
    }

    /// Add a color as an admin, returning its id.
    pub async fn add_color(&self, product_id: &str, code: &str, stock: i32) -> String {
        let response = self
            .post(
                &format!("/api/product/{product_id}/colors"),
                Some(&admin_token()),
                json!({ "code": code, "existingQuantity": stock }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.str("colorId")
    }

    /// Current stock of one color, read through the product endpoint.
    pub async fn stock_of(&self, product_id: &str, color_id: &str) -> i64 {
        let response = self
            .get(
                &format!("/api/product/{product_id}?includeColors=true"),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["colors"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["colorId"] == color_id)
            .and_then(|c| c["stockCount"].as_i64())
            .unwrap_or_else(|| panic!("color {color_id} not on product {product_id}"))
    }
}

/// One order line body.
pub fn order_line(
    product_id: &str,
    color_id: &str,
    product_name: &str,
    color_code: &str,
    quantity: i32,
) -> Value {
    json!({
        "productId": product_id,
        "colorId": color_id,
        "productName": product_name,
        "category": "KnittingThreads",
        "colorCode": color_code,
        "quantity": quantity,
    })
}

// =============================================================================
// Tokens
// =============================================================================

/// Mint a token signed with [`TEST_SECRET`], valid for an hour.
pub fn token(subject: &str, name: Option<&str>, roles: &[&str]) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    let mut claims = json!({ "sub": subject, "roles": roles, "exp": exp });
    if let Some(name) = name {
        claims["name"] = json!(name);
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn admin_token() -> String {
    token("auth0|admin", Some("Dana Admin"), &["Admin"])
}

pub fn employee_token() -> String {
    token("auth0|employee", Some("Eli Employee"), &["Employee"])
}
