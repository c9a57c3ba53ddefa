//! `PostgreSQL` implementation of [`Store`].
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a live database. Stock changes lock the color rows with
//! `SELECT ... FOR UPDATE` inside a transaction, so concurrent orders against
//! the same color apply one after the other instead of overwriting each other.
//! An order locks all of its colors up front in id order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use stocks_core::{
    ColorId, OrderId, OrderItemId, PageRequest, ProductCategory, ProductId, adjust_stock, fulfil,
};

use super::{RepositoryError, Store, color_not_found, product_not_found};
use crate::models::{
    EditedProduct, LineFulfilment, NewColor, NewOrder, NewProduct, Order, OrderItem, OrderPage,
    OrderWithItems, PlacedOrder, Product, ProductColor, ProductUpdate, ProductWithColors,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    category: ProductCategory,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ColorRow {
    id: ColorId,
    product_id: ProductId,
    code: String,
    stock_count: i32,
}

impl From<ColorRow> for ProductColor {
    fn from(row: ColorRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            code: row.code,
            stock_count: row.stock_count,
        }
    }
}

/// One row of the product/color outer join.
#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    product_id: ProductId,
    name: String,
    category: ProductCategory,
    color_id: Option<ColorId>,
    code: Option<String>,
    stock_count: Option<i32>,
}

impl ListingRow {
    /// The joined color, absent for a product without colors.
    fn color(&self) -> Option<ProductColor> {
        Some(ProductColor {
            id: self.color_id?,
            product_id: self.product_id,
            code: self.code.clone()?,
            stock_count: self.stock_count?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    client_name: String,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            client_name: row.client_name,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    color_id: ColorId,
    product_name: String,
    category: ProductCategory,
    color_code: String,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            color_id: row.color_id,
            product_name: row.product_name,
            category: row.category,
            color_code: row.color_code,
            quantity: row.quantity,
        }
    }
}

/// Map a unique-index violation to `Conflict`, anything else to `Database`.
fn conflict_or_database(err: sqlx::Error, message: impl FnOnce() -> String) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(message())
        }
        _ => RepositoryError::Database(err),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn colors_for(&self, product_id: ProductId) -> Result<Vec<ProductColor>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ColorRow>(
            r"
            SELECT id, product_id, code, stock_count
            FROM product_colors
            WHERE product_id = $1
            ORDER BY code ASC
            ",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Lock every listed color row for the rest of the transaction.
///
/// Rows are locked in id order, so transactions touching the same colors
/// always queue in the same order and cannot deadlock.
async fn lock_colors(
    tx: &mut Transaction<'_, Postgres>,
    color_ids: &[ColorId],
) -> Result<HashMap<ColorId, ColorRow>, sqlx::Error> {
    let mut ids: Vec<Uuid> = color_ids.iter().map(ColorId::as_uuid).collect();
    ids.sort_unstable();
    ids.dedup();

    let rows = sqlx::query_as::<_, ColorRow>(
        r"
        SELECT id, product_id, code, stock_count
        FROM product_colors
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

/// Lock one color row of a product for the rest of the transaction.
async fn lock_color(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    color_id: ColorId,
) -> Result<Option<ColorRow>, sqlx::Error> {
    sqlx::query_as::<_, ColorRow>(
        r"
        SELECT id, product_id, code, stock_count
        FROM product_colors
        WHERE id = $1 AND product_id = $2
        FOR UPDATE
        ",
    )
    .bind(color_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

async fn set_stock(
    tx: &mut Transaction<'_, Postgres>,
    color_id: ColorId,
    stock_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE product_colors SET stock_count = $2 WHERE id = $1")
        .bind(color_id)
        .bind(stock_count)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn product_name_exists(
        &self,
        name: &str,
        excluding: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM products
                WHERE LOWER(name) = LOWER($1)
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (id, name, category)
            VALUES ($1, $2, $3)
            RETURNING id, name, category
            ",
        )
        .bind(ProductId::generate())
        .bind(&product.name)
        .bind(product.category)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_database(e, || {
                "Product with the same name already exists.".to_string()
            })
        })?;

        Ok(row.into())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, category FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_product_with_colors(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithColors>, RepositoryError> {
        let Some(product) = self.find_product(id).await? else {
            return Ok(None);
        };
        let colors = self.colors_for(id).await?;
        Ok(Some(ProductWithColors { product, colors }))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<EditedProduct, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product: Product = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products
            SET name = $2, category = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, category
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.category)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            conflict_or_database(e, || "A product with this name already exists".to_string())
        })?
        .ok_or_else(|| product_not_found(id))?
        .into();

        let color = match update.stock {
            Some(adjustment) => {
                let row = lock_color(&mut tx, id, adjustment.color_id)
                    .await?
                    .ok_or_else(|| color_not_found(adjustment.color_id, &product.name))?;
                let stock_count = adjust_stock(row.stock_count, adjustment.delta);
                set_stock(&mut tx, row.id, stock_count).await?;
                let mut color = ProductColor::from(row);
                color.stock_count = stock_count;
                Some(color)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(EditedProduct { product, color })
    }

    async fn insert_color(
        &self,
        product_id: ProductId,
        color: &NewColor,
    ) -> Result<ProductColor, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the product so a concurrent delete cannot orphan the insert.
        let exists = sqlx::query_scalar::<_, ProductId>(
            "SELECT id FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(product_not_found(product_id));
        }

        let row = sqlx::query_as::<_, ColorRow>(
            r"
            INSERT INTO product_colors (id, product_id, code, stock_count)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, code, stock_count
            ",
        )
        .bind(ColorId::generate())
        .bind(product_id)
        .bind(&color.code)
        .bind(color.stock_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_or_database(e, || {
                format!("Color with code '{}' already exists for this product.", color.code)
            })
        })?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_color(
        &self,
        product_id: ProductId,
        color_id: ColorId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product_colors WHERE id = $1 AND product_id = $2")
            .bind(color_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM product_colors WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_products(&self) -> Result<Vec<ProductWithColors>, RepositoryError> {
        // One statement, one snapshot: every color row arrives with its product.
        let rows = sqlx::query_as::<_, ListingRow>(
            r"
            SELECT p.id AS product_id, p.name, p.category,
                   c.id AS color_id, c.code, c.stock_count
            FROM products p
            LEFT JOIN product_colors c ON c.product_id = p.id
            ORDER BY LOWER(p.name) ASC, p.id ASC, c.code ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: Vec<ProductWithColors> = Vec::new();
        for row in rows {
            let color = row.color();
            let same_product = grouped
                .last()
                .is_some_and(|last| last.product.id == row.product_id);
            if !same_product {
                grouped.push(ProductWithColors {
                    product: Product {
                        id: row.product_id,
                        name: row.name,
                        category: row.category,
                    },
                    colors: Vec::new(),
                });
            }
            if let (Some(color), Some(entry)) = (color, grouped.last_mut()) {
                entry.colors.push(color);
            }
        }

        Ok(grouped)
    }

    async fn place_order(&self, order: &NewOrder) -> Result<PlacedOrder, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let color_ids: Vec<ColorId> = order.lines.iter().map(|line| line.color_id).collect();
        let locked = lock_colors(&mut tx, &color_ids).await?;

        // Running stock per color, so repeated lines see the earlier line's result.
        let mut stock: HashMap<ColorId, i32> = HashMap::with_capacity(locked.len());
        let mut fulfilments = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product_name = sqlx::query_scalar::<_, String>(
                "SELECT name FROM products WHERE id = $1",
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| product_not_found(line.product_id))?;

            let color = locked
                .get(&line.color_id)
                .filter(|color| color.product_id == line.product_id)
                .ok_or_else(|| color_not_found(line.color_id, &product_name))?;

            let current = stock.get(&color.id).copied().unwrap_or(color.stock_count);
            let fulfilment = fulfil(current, line.quantity);
            stock.insert(color.id, fulfilment.remaining);

            fulfilments.push(LineFulfilment {
                product_id: line.product_id,
                product_name,
                color_id: color.id,
                color_code: color.code.clone(),
                requested: line.quantity,
                fulfilment,
            });
        }

        for (color_id, remaining) in stock {
            set_stock(&mut tx, color_id, remaining).await?;
        }

        let header = Order {
            id: OrderId::generate(),
            client_name: order.client_name.clone(),
            // Postgres keeps microseconds; truncate so the returned value matches a re-read.
            created_at: Utc::now().trunc_subsecs(6),
            created_by: order.created_by.clone(),
        };

        sqlx::query(
            r"
            INSERT INTO orders (id, client_name, created_at, created_by)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(header.id)
        .bind(&header.client_name)
        .bind(header.created_at)
        .bind(&header.created_by)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for (position, line) in (0_i32..).zip(&order.lines) {
            let item = OrderItem {
                id: OrderItemId::generate(),
                order_id: header.id,
                product_id: line.product_id,
                color_id: line.color_id,
                product_name: line.product_name.clone(),
                category: line.category,
                color_code: line.color_code.clone(),
                quantity: line.quantity,
            };

            sqlx::query(
                r"
                INSERT INTO order_items (
                    id, order_id, product_id, color_id,
                    product_name, category, color_code, quantity, position
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.color_id)
            .bind(&item.product_name)
            .bind(item.category)
            .bind(&item.color_code)
            .bind(item.quantity)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        Ok(PlacedOrder {
            order: OrderWithItems {
                order: header,
                items,
            },
            fulfilments,
        })
    }

    async fn list_orders(&self, page: PageRequest) -> Result<OrderPage, RepositoryError> {
        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, client_name, created_at, created_by
            FROM orders
            ORDER BY created_at DESC, seq DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderPage {
            total_count,
            orders: rows.into_iter().map(Into::into).collect(),
        })
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            "SELECT id, client_name, created_at, created_by FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT
                id, order_id, product_id, color_id,
                product_name, category, color_code, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderWithItems {
            order: order.into(),
            items: items.into_iter().map(Into::into).collect(),
        }))
    }
}
