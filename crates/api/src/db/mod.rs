//! Persistence for the catalog and orders.
//!
//! # Tables
//!
//! - `products` - Catalog products (name unique on `LOWER(name)`)
//! - `product_colors` - Stock-tracked colors, cascade-deleted with their product
//! - `orders` - Saved customer orders
//! - `order_items` - Immutable order line snapshots
//!
//! # Stores
//!
//! Handlers talk to the [`Store`] trait. [`PgStore`] is the production
//! implementation; [`MemoryStore`] backs tests and local development.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run either at server
//! startup (`STOCKS_RUN_MIGRATIONS=true`) or via:
//! ```bash
//! cargo run -p stocks-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use stocks_core::{ColorId, OrderId, PageRequest, ProductId};

use crate::models::{
    EditedProduct, NewColor, NewOrder, NewProduct, OrderPage, OrderWithItems, PlacedOrder,
    Product, ProductColor, ProductUpdate, ProductWithColors,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (duplicate product name or color code).
    #[error("{0}")]
    Conflict(String),
}

/// Data-access abstraction over the catalog and order tables.
///
/// Every method is a single unit of work: methods that write more than one
/// row do so atomically, and stock-changing methods serialize with concurrent
/// writers of the same color.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Whether a product with this name exists (case-insensitive), optionally
    /// ignoring one product.
    async fn product_name_exists(
        &self,
        name: &str,
        excluding: Option<ProductId>,
    ) -> Result<bool, RepositoryError>;

    /// Insert a product with no colors.
    ///
    /// Fails with `Conflict` if the name is taken.
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Load a product without its colors.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Load a product with its colors.
    async fn find_product_with_colors(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithColors>, RepositoryError>;

    /// Rename/recategorize a product and optionally adjust one color's stock.
    ///
    /// Fails with `NotFound` if the product or the adjusted color is missing,
    /// `Conflict` if the new name is taken.
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<EditedProduct, RepositoryError>;

    /// Add a color to a product.
    ///
    /// Fails with `NotFound` if the product is missing, `Conflict` if the code
    /// is taken on that product.
    async fn insert_color(
        &self,
        product_id: ProductId,
        color: &NewColor,
    ) -> Result<ProductColor, RepositoryError>;

    /// Delete one color. Returns `false` if no such color exists on the product.
    async fn delete_color(
        &self,
        product_id: ProductId,
        color_id: ColorId,
    ) -> Result<bool, RepositoryError>;

    /// Delete a product and all of its colors. Returns `false` if absent.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// All products with their colors, ordered by name.
    async fn list_products(&self) -> Result<Vec<ProductWithColors>, RepositoryError>;

    /// Save an order and take its quantities out of stock, all or nothing.
    ///
    /// Fails with `NotFound` if any referenced product or color is missing.
    async fn place_order(&self, order: &NewOrder) -> Result<PlacedOrder, RepositoryError>;

    /// One page of orders, newest first.
    async fn list_orders(&self, page: PageRequest) -> Result<OrderPage, RepositoryError>;

    /// Load an order with its items.
    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError>;
}

/// Message used when a referenced product does not exist.
pub(crate) fn product_not_found(id: ProductId) -> RepositoryError {
    RepositoryError::NotFound(format!("Product with ID {id} not found."))
}

/// Message used when a referenced color does not exist on its product.
pub(crate) fn color_not_found(id: ColorId, product_name: &str) -> RepositoryError {
    RepositoryError::NotFound(format!(
        "Color with ID {id} not found for product {product_name}."
    ))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the embedded migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
