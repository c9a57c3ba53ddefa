//! Order models.

use chrono::{DateTime, Utc};

use stocks_core::{ColorId, Fulfilment, OrderId, OrderItemId, ProductCategory, ProductId};

/// A saved customer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Customer name.
    pub client_name: String,
    /// When the order was saved.
    pub created_at: DateTime<Utc>,
    /// Identity of the authenticated caller who saved the order, if any.
    pub created_by: Option<String>,
}

/// An order line. Snapshot fields are copied at order time and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Unique item ID.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Product ordered (may no longer exist).
    pub product_id: ProductId,
    /// Color ordered (may no longer exist).
    pub color_id: ColorId,
    /// Product name at order time.
    pub product_name: String,
    /// Product category at order time.
    pub category: ProductCategory,
    /// Color code at order time.
    pub color_code: String,
    /// Units ordered.
    pub quantity: i32,
}

/// An order with its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithItems {
    /// The order header.
    pub order: Order,
    /// Items in request order.
    pub items: Vec<OrderItem>,
}

/// One validated line of an order to place.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    /// Product to take stock from.
    pub product_id: ProductId,
    /// Color to take stock from.
    pub color_id: ColorId,
    /// Product name snapshot.
    pub product_name: String,
    /// Category snapshot.
    pub category: ProductCategory,
    /// Color code snapshot.
    pub color_code: String,
    /// Units ordered (> 0).
    pub quantity: i32,
}

/// A validated order to place.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Customer name.
    pub client_name: String,
    /// Caller identity, if authenticated.
    pub created_by: Option<String>,
    /// Order lines (at least one).
    pub lines: Vec<NewOrderLine>,
}

/// Stock outcome for one order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFulfilment {
    /// Product the stock was taken from.
    pub product_id: ProductId,
    /// Current catalog name of the product.
    pub product_name: String,
    /// Color the stock was taken from.
    pub color_id: ColorId,
    /// Current catalog code of the color.
    pub color_code: String,
    /// Units requested on the line.
    pub requested: i32,
    /// Stock before/after and any shortfall.
    pub fulfilment: Fulfilment,
}

/// Result of placing an order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    /// The saved order and its items.
    pub order: OrderWithItems,
    /// Stock outcome per line, in line order.
    pub fulfilments: Vec<LineFulfilment>,
}

/// One page of orders.
#[derive(Debug, Clone)]
pub struct OrderPage {
    /// Total number of orders across all pages.
    pub total_count: i64,
    /// Orders on the requested page, newest first.
    pub orders: Vec<Order>,
}
