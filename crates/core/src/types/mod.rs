//! Core types for Stocks.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod category;
pub mod id;
pub mod pagination;
pub mod stock;

pub use category::{ParseCategoryError, ProductCategory};
pub use id::*;
pub use pagination::PageRequest;
pub use stock::{Fulfilment, adjust_stock, fulfil};
