//! In-memory implementation of [`Store`].
//!
//! Mirrors the `PostgreSQL` store's constraints (case-insensitive unique names
//! and codes, cascade on product delete) so route tests exercise the same
//! rules. Each operation holds the write lock for its whole duration, which
//! gives the same all-or-nothing behavior as a transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use stocks_core::{
    ColorId, OrderId, OrderItemId, PageRequest, ProductId, adjust_stock, fulfil,
};

use super::{RepositoryError, Store, color_not_found, product_not_found};
use crate::models::{
    EditedProduct, LineFulfilment, NewColor, NewOrder, NewProduct, Order, OrderItem, OrderPage,
    OrderWithItems, PlacedOrder, Product, ProductColor, ProductUpdate, ProductWithColors,
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    colors: HashMap<ColorId, ProductColor>,
    /// Orders in insertion order.
    orders: Vec<OrderWithItems>,
}

impl Tables {
    fn name_taken(&self, name: &str, excluding: Option<ProductId>) -> bool {
        let wanted = name.to_lowercase();
        self.products
            .values()
            .any(|p| Some(p.id) != excluding && p.name.to_lowercase() == wanted)
    }

    fn colors_of(&self, product_id: ProductId) -> Vec<ProductColor> {
        let mut colors: Vec<ProductColor> = self
            .colors
            .values()
            .filter(|c| c.product_id == product_id)
            .cloned()
            .collect();
        colors.sort_by(|a, b| a.code.cmp(&b.code));
        colors
    }

    fn color_of(&self, product_id: ProductId, color_id: ColorId) -> Option<&ProductColor> {
        self.colors
            .get(&color_id)
            .filter(|c| c.product_id == product_id)
    }
}

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn product_name_exists(
        &self,
        name: &str,
        excluding: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.tables.read().await.name_taken(name, excluding))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&product.name, None) {
            return Err(RepositoryError::Conflict(
                "Product with the same name already exists.".to_string(),
            ));
        }

        let product = Product {
            id: ProductId::generate(),
            name: product.name.clone(),
            category: product.category,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_product_with_colors(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithColors>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&id).map(|product| ProductWithColors {
            product: product.clone(),
            colors: tables.colors_of(id),
        }))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<EditedProduct, RepositoryError> {
        let mut tables = self.tables.write().await;

        let current = tables.products.get(&id).ok_or_else(|| product_not_found(id))?;
        if tables.name_taken(&update.name, Some(id)) {
            return Err(RepositoryError::Conflict(
                "A product with this name already exists".to_string(),
            ));
        }

        // Resolve the color before writing anything.
        let adjusted = match update.stock {
            Some(adjustment) => {
                let color = tables
                    .color_of(id, adjustment.color_id)
                    .ok_or_else(|| color_not_found(adjustment.color_id, &current.name))?;
                Some(ProductColor {
                    stock_count: adjust_stock(color.stock_count, adjustment.delta),
                    ..color.clone()
                })
            }
            None => None,
        };

        let product = Product {
            id,
            name: update.name.clone(),
            category: update.category,
        };
        tables.products.insert(id, product.clone());
        if let Some(color) = &adjusted {
            tables.colors.insert(color.id, color.clone());
        }

        Ok(EditedProduct {
            product,
            color: adjusted,
        })
    }

    async fn insert_color(
        &self,
        product_id: ProductId,
        color: &NewColor,
    ) -> Result<ProductColor, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product_id) {
            return Err(product_not_found(product_id));
        }

        let wanted = color.code.to_lowercase();
        let duplicate = tables
            .colors
            .values()
            .any(|c| c.product_id == product_id && c.code.to_lowercase() == wanted);
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "Color with code '{}' already exists for this product.",
                color.code
            )));
        }

        let color = ProductColor {
            id: ColorId::generate(),
            product_id,
            code: color.code.clone(),
            stock_count: color.stock_count,
        };
        tables.colors.insert(color.id, color.clone());
        Ok(color)
    }

    async fn delete_color(
        &self,
        product_id: ProductId,
        color_id: ColorId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.color_of(product_id, color_id).is_none() {
            return Ok(false);
        }
        tables.colors.remove(&color_id);
        Ok(true)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.products.remove(&id).is_none() {
            return Ok(false);
        }
        tables.colors.retain(|_, c| c.product_id != id);
        Ok(true)
    }

    async fn list_products(&self) -> Result<Vec<ProductWithColors>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut products: Vec<ProductWithColors> = tables
            .products
            .values()
            .map(|product| ProductWithColors {
                product: product.clone(),
                colors: tables.colors_of(product.id),
            })
            .collect();
        products.sort_by(|a, b| {
            a.product
                .name
                .to_lowercase()
                .cmp(&b.product.name.to_lowercase())
                .then(a.product.id.cmp(&b.product.id))
        });
        Ok(products)
    }

    async fn place_order(&self, order: &NewOrder) -> Result<PlacedOrder, RepositoryError> {
        let mut tables = self.tables.write().await;

        // Work on a scratch copy of stock so a failure leaves nothing applied,
        // and repeated lines for one color see the earlier line's result.
        let mut stock: HashMap<ColorId, i32> = HashMap::new();
        let mut fulfilments = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let product = tables
                .products
                .get(&line.product_id)
                .ok_or_else(|| product_not_found(line.product_id))?;
            let color = tables
                .color_of(line.product_id, line.color_id)
                .ok_or_else(|| color_not_found(line.color_id, &product.name))?;

            let current = stock.get(&color.id).copied().unwrap_or(color.stock_count);
            let fulfilment = fulfil(current, line.quantity);
            stock.insert(color.id, fulfilment.remaining);

            fulfilments.push(LineFulfilment {
                product_id: product.id,
                product_name: product.name.clone(),
                color_id: color.id,
                color_code: color.code.clone(),
                requested: line.quantity,
                fulfilment,
            });
        }

        for (color_id, remaining) in stock {
            if let Some(color) = tables.colors.get_mut(&color_id) {
                color.stock_count = remaining;
            }
        }

        let header = Order {
            id: OrderId::generate(),
            client_name: order.client_name.clone(),
            created_at: Utc::now(),
            created_by: order.created_by.clone(),
        };
        let items = order
            .lines
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::generate(),
                order_id: header.id,
                product_id: line.product_id,
                color_id: line.color_id,
                product_name: line.product_name.clone(),
                category: line.category,
                color_code: line.color_code.clone(),
                quantity: line.quantity,
            })
            .collect();

        let saved = OrderWithItems {
            order: header,
            items,
        };
        tables.orders.push(saved.clone());

        Ok(PlacedOrder {
            order: saved,
            fulfilments,
        })
    }

    async fn list_orders(&self, page: PageRequest) -> Result<OrderPage, RepositoryError> {
        let tables = self.tables.read().await;

        // Newest first; later insertions win ties on the timestamp.
        let mut orders: Vec<(usize, &Order)> = tables
            .orders
            .iter()
            .map(|o| &o.order)
            .enumerate()
            .collect();
        orders.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at.cmp(&a.created_at).then(seq_b.cmp(seq_a))
        });

        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let total_count = i64::try_from(orders.len()).map_err(|_| {
            RepositoryError::DataCorruption("order count exceeds i64".to_string())
        })?;

        Ok(OrderPage {
            total_count,
            orders: orders
                .into_iter()
                .skip(skip)
                .take(take)
                .map(|(_, order)| order.clone())
                .collect(),
        })
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.order.id == id).cloned())
    }
}
