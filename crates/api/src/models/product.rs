//! Product and product color models.

use serde::Serialize;

use stocks_core::{ColorId, ProductCategory, ProductId};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Product name (unique, case-insensitive).
    pub name: String,
    /// Product category.
    pub category: ProductCategory,
}

/// A stock-tracked color variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductColor {
    /// Unique color ID.
    pub id: ColorId,
    /// Owning product.
    pub product_id: ProductId,
    /// Color code (unique per product, case-insensitive).
    pub code: String,
    /// Units in stock, never negative.
    pub stock_count: i32,
}

/// A product with its colors eagerly loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductWithColors {
    /// The product itself.
    pub product: Product,
    /// Colors ordered by code.
    pub colors: Vec<ProductColor>,
}

impl ProductWithColors {
    /// Find a color of this product by ID.
    #[must_use]
    pub fn color(&self, id: ColorId) -> Option<&ProductColor> {
        self.colors.iter().find(|c| c.id == id)
    }

    /// Whether a color with this code exists, ignoring case.
    #[must_use]
    pub fn has_color_code(&self, code: &str) -> bool {
        self.colors
            .iter()
            .any(|c| c.code.to_lowercase() == code.to_lowercase())
    }
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Product name.
    pub name: String,
    /// Product category.
    pub category: ProductCategory,
}

/// Input for adding a color to a product.
#[derive(Debug, Clone)]
pub struct NewColor {
    /// Color code.
    pub code: String,
    /// Initial stock.
    pub stock_count: i32,
}

/// A relative stock change for one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    /// Color to adjust.
    pub color_id: ColorId,
    /// Units to add (negative to remove).
    pub delta: i32,
}

/// Input for editing a product.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    /// New name.
    pub name: String,
    /// New category.
    pub category: ProductCategory,
    /// Optional stock change applied in the same transaction.
    pub stock: Option<StockAdjustment>,
}

/// Result of a product edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedProduct {
    /// Product after the edit.
    pub product: Product,
    /// Adjusted color, when the edit carried a stock change.
    pub color: Option<ProductColor>,
}
