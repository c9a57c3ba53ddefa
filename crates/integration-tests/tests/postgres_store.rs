//! `PostgreSQL` store integration tests.
//!
//! These tests run against a real database and are ignored by default.
//! Point `STOCKS_TEST_DATABASE_URL` at a disposable database and run:
//!
//! ```bash
//! cargo test -p stocks-integration-tests --test postgres_store -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use secrecy::SecretString;

use stocks_api::db::{self, PgStore, RepositoryError, Store};
use stocks_api::models::{NewColor, NewOrder, NewOrderLine, NewProduct, ProductUpdate, StockAdjustment};
use stocks_core::{ColorId, ProductCategory, ProductId};

async fn store() -> PgStore {
    let url = std::env::var("STOCKS_TEST_DATABASE_URL")
        .expect("STOCKS_TEST_DATABASE_URL must be set for PostgreSQL tests");
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    PgStore::new(pool)
}

/// A product with one color, named uniquely so runs don't collide.
async fn product_with_color(store: &PgStore, stock: i32) -> (ProductId, ColorId, String) {
    let name = format!("Yarn {}", ProductId::generate());
    let product = store
        .insert_product(&NewProduct {
            name: name.clone(),
            category: ProductCategory::KnittingThreads,
        })
        .await
        .unwrap();
    let color = store
        .insert_color(
            product.id,
            &NewColor {
                code: "RED01".to_string(),
                stock_count: stock,
            },
        )
        .await
        .unwrap();
    (product.id, color.id, name)
}

fn one_line_order(product_id: ProductId, color_id: ColorId, name: &str, quantity: i32) -> NewOrder {
    NewOrder {
        client_name: "Concurrent".to_string(),
        created_by: None,
        lines: vec![NewOrderLine {
            product_id,
            color_id,
            product_name: name.to_string(),
            category: ProductCategory::KnittingThreads,
            color_code: "RED01".to_string(),
            quantity,
        }],
    }
}

async fn stock_of(store: &PgStore, product_id: ProductId, color_id: ColorId) -> i32 {
    store
        .find_product_with_colors(product_id)
        .await
        .unwrap()
        .and_then(|p| p.color(color_id).map(|c| c.stock_count))
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_concurrent_orders_do_not_lose_updates() {
    let store = Arc::new(store().await);
    let (product_id, color_id, name) = product_with_color(&store, 20).await;

    let tasks: Vec<_> = (0..15)
        .map(|_| {
            let store = Arc::clone(&store);
            let order = one_line_order(product_id, color_id, &name, 1);
            tokio::spawn(async move { store.place_order(&order).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(stock_of(&store, product_id, color_id).await, 5);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_failed_order_rolls_back() {
    let store = store().await;
    let (product_id, color_id, name) = product_with_color(&store, 10).await;

    let mut order = one_line_order(product_id, color_id, &name, 4);
    let mut missing = order.lines[0].clone();
    missing.color_id = ColorId::generate();
    order.lines.push(missing);

    let err = store.place_order(&order).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
    assert_eq!(stock_of(&store, product_id, color_id).await, 10);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_stock_adjustment_and_oversell_clamp_to_zero() {
    let store = store().await;
    let (product_id, color_id, name) = product_with_color(&store, 3).await;

    let edited = store
        .update_product(
            product_id,
            &ProductUpdate {
                name: name.clone(),
                category: ProductCategory::KnittingThreads,
                stock: Some(StockAdjustment {
                    color_id,
                    delta: -10,
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.color.unwrap().stock_count, 0);

    let placed = store
        .place_order(&one_line_order(product_id, color_id, &name, 2))
        .await
        .unwrap();
    assert!(placed.fulfilments[0].fulfilment.is_oversold());
    assert_eq!(stock_of(&store, product_id, color_id).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_names_are_unique_case_insensitively() {
    let store = store().await;
    let (product_id, _, name) = product_with_color(&store, 0).await;

    assert!(store.product_name_exists(&name.to_uppercase(), None).await.unwrap());
    assert!(
        !store
            .product_name_exists(&name.to_uppercase(), Some(product_id))
            .await
            .unwrap()
    );

    let err = store
        .insert_product(&NewProduct {
            name: name.to_lowercase(),
            category: ProductCategory::Laces,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_delete_product_cascades_to_colors() {
    let store = store().await;
    let (product_id, color_id, _) = product_with_color(&store, 5).await;

    assert!(store.delete_product(product_id).await.unwrap());
    assert!(store.find_product(product_id).await.unwrap().is_none());
    assert!(!store.delete_color(product_id, color_id).await.unwrap());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_orders_locking_colors_in_opposite_order_all_succeed() {
    let store = Arc::new(store().await);
    let (product_id, red, name) = product_with_color(&store, 1_000).await;
    let blue = store
        .insert_color(
            product_id,
            &NewColor {
                code: "BLUE".to_string(),
                stock_count: 1_000,
            },
        )
        .await
        .unwrap()
        .id;

    let mut forward = one_line_order(product_id, red, &name, 1);
    let mut second = forward.lines[0].clone();
    second.color_id = blue;
    second.color_code = "BLUE".to_string();
    forward.lines.push(second);
    let mut backward = forward.clone();
    backward.lines.reverse();

    for _ in 0..20 {
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let order = if i % 2 == 0 {
                    forward.clone()
                } else {
                    backward.clone()
                };
                tokio::spawn(async move { store.place_order(&order).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }

    assert_eq!(stock_of(&store, product_id, red).await, 840);
    assert_eq!(stock_of(&store, product_id, blue).await, 840);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOCKS_TEST_DATABASE_URL)"]
async fn test_listing_during_inserts_never_fails() {
    let store = Arc::new(store().await);

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..200 {
                product_with_color(&store, 1).await;
            }
        })
    };

    while !writer.is_finished() {
        let products = store.list_products().await.unwrap();
        for entry in &products {
            assert!(entry.colors.iter().all(|c| c.product_id == entry.product.id));
        }
    }
    writer.await.unwrap();
}
