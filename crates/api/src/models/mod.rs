//! Domain models for the catalog and orders.
//!
//! These are the shapes passed between route handlers and the [`Store`](crate::db::Store).
//! HTTP request/response DTOs live next to their handlers in [`crate::routes`].

pub mod order;
pub mod product;

pub use order::{
    LineFulfilment, NewOrder, NewOrderLine, Order, OrderItem, OrderPage, OrderWithItems,
    PlacedOrder,
};
pub use product::{
    EditedProduct, NewColor, NewProduct, Product, ProductColor, ProductUpdate, ProductWithColors,
    StockAdjustment,
};
