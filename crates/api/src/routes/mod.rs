//! HTTP routes for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (checks the store)
//!
//! # Catalog
//! POST   /api/product                     - Create product            (Admin)
//! GET    /api/product/{id}                - Get product               (public)
//! PUT    /api/product/{id}                - Edit product / stock      (Admin)
//! DELETE /api/product/{id}                - Delete product            (Admin)
//! POST   /api/product/{id}/colors         - Add color                 (public)
//! DELETE /api/product/{id}/colors/{color_id} - Delete color           (Admin)
//! GET    /api/products                    - Product/color listing     (Employee)
//!
//! # Orders
//! POST   /api/orders                      - Save order                (public)
//! GET    /api/orders                      - Paged order list          (Employee)
//! GET    /api/orders/{id}                 - Order details             (Employee)
//! ```
//!
//! Any other path is served from the frontend directory when one is
//! configured, falling back to its `index.html`.

pub mod orders;
pub mod products;

use std::path::Path;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::authorize;
use crate::state::AppState;

/// Catalog routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/product", post(products::create))
        .route(
            "/api/product/{id}",
            get(products::show)
                .put(products::edit)
                .delete(products::delete),
        )
        .route("/api/product/{id}/colors", post(products::add_color))
        .route(
            "/api/product/{id}/colors/{color_id}",
            delete(products::delete_color),
        )
        .route("/api/products", get(products::list))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(orders::save).get(orders::list))
        .route("/api/orders/{id}", get(orders::show))
}

/// Every `/api` route, guarded by [`authorize`].
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(product_routes())
        .merge(order_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
}

/// Build the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `static_dir` - Built frontend to serve for non-API paths, if any
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api_routes(&state));

    let app = match static_dir {
        Some(dir) => app.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => app,
    };

    app.with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{AuthConfig, AuthKeys};
    use crate::db::MemoryStore;
    use crate::services::TokenVerifier;

    fn state() -> AppState {
        let config = AuthConfig {
            keys: AuthKeys::Shared {
                secret: "k9Qz!4vT#pL2@xW7$mN8^rB1&cH5*dJ3".to_string().into(),
                issuer: None,
                audience: None,
            },
            roles_claim: "roles".to_string(),
        };
        AppState::new(Arc::new(MemoryStore::new()), TokenVerifier::new(&config))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = router(state(), None);
        assert_eq!(get(app.clone(), "/health").await, (StatusCode::OK, "ok".to_string()));
        assert_eq!(get(app, "/health/ready").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_without_frontend_is_not_found() {
        let app = router(state(), None);
        assert_eq!(get(app, "/inventory").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_frontend_falls_back_to_index() {
        let dir = std::env::temp_dir().join(format!("stocks-frontend-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>stocks</html>").unwrap();
        std::fs::write(dir.join("app.js"), "console.log(1)").unwrap();

        let app = router(state(), Some(&dir));
        assert_eq!(get(app.clone(), "/app.js").await.1, "console.log(1)");
        assert_eq!(get(app.clone(), "/orders/42").await.1, "<html>stocks</html>");
        // API routes still win
        assert_eq!(get(app, "/health").await.1, "ok");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
