//! Request validation.
//!
//! Validators collect every problem in a request instead of stopping at the
//! first one, so a client sees all field errors in a single 400 response.
//!
//! ```rust,ignore
//! let mut v = Validator::new();
//! let name = v.check(product_name("name", &req.name));
//! let category = v.check(category("category", &req.category));
//! let product = v.finish(|| Some(NewProduct { name: name?, category: category? }))?;
//! ```

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use stocks_core::ProductCategory;

use crate::models::{NewColor, NewProduct};

const PRODUCT_NAME_MIN: usize = 2;
const PRODUCT_NAME_MAX: usize = 100;
const SNAPSHOT_NAME_MAX: usize = 200;
const COLOR_CODE_MAX: usize = 20;
const CLIENT_NAME_MAX: usize = 100;

/// A problem with one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Field path, e.g. `name` or `items[2].quantity`.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every field error found in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("One or more validation errors occurred.")]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// A single-field failure.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    /// The collected errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }
}

/// Accumulates field errors across several checks.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error from a field check, if any, and pass the value on.
    pub fn check<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    /// Record an error that doesn't come from a field check.
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Build the validated value, or return every error collected.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if any check failed.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        match build() {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(ValidationErrors(self.errors)),
        }
    }
}

// =============================================================================
// Field checks
// =============================================================================

/// Catalog product name: trimmed, 2 to 100 characters.
///
/// # Errors
///
/// Returns a `FieldError` if the name is empty or out of range.
pub fn product_name(field: &str, value: &str) -> Result<String, FieldError> {
    let name = value.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(FieldError::new(field, "Product name is required"));
    }
    if len < PRODUCT_NAME_MIN {
        return Err(FieldError::new(
            field,
            "Product name must be at least 2 characters",
        ));
    }
    if len > PRODUCT_NAME_MAX {
        return Err(FieldError::new(
            field,
            "Product name cannot exceed 100 characters",
        ));
    }
    Ok(name.to_string())
}

/// Product category given by variant name.
///
/// # Errors
///
/// Returns a `FieldError` if the value is empty or not a known category.
pub fn category(field: &str, value: &str) -> Result<ProductCategory, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "Category is required"));
    }
    value
        .parse()
        .map_err(|_| FieldError::new(field, "Invalid product category"))
}

/// Color code: 1 to 20 ASCII letters or digits.
///
/// # Errors
///
/// Returns a `FieldError` if the code is empty, too long or has other characters.
pub fn color_code(field: &str, value: &str) -> Result<String, FieldError> {
    if value.is_empty() {
        return Err(FieldError::new(field, "Color code is required"));
    }
    if value.chars().count() > COLOR_CODE_MAX {
        return Err(FieldError::new(
            field,
            "Color code cannot exceed 20 characters",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FieldError::new(
            field,
            "Color code can only contain letters and numbers",
        ));
    }
    Ok(value.to_string())
}

/// Initial stock for a new color.
///
/// # Errors
///
/// Returns a `FieldError` if the quantity is negative.
pub fn stock_quantity(field: &str, value: i32) -> Result<i32, FieldError> {
    if value < 0 {
        return Err(FieldError::new(field, "Quantity cannot be negative"));
    }
    Ok(value)
}

/// Units on an order line.
///
/// # Errors
///
/// Returns a `FieldError` unless the quantity is positive.
pub fn order_quantity(field: &str, value: i32) -> Result<i32, FieldError> {
    if value <= 0 {
        return Err(FieldError::new(field, "Quantity must be greater than 0"));
    }
    Ok(value)
}

/// Customer name on an order.
///
/// # Errors
///
/// Returns a `FieldError` if the name is blank or longer than 100 characters.
pub fn client_name(field: &str, value: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "Client name is required"));
    }
    if value.chars().count() > CLIENT_NAME_MAX {
        return Err(FieldError::new(
            field,
            "Client name cannot exceed 100 characters",
        ));
    }
    Ok(value.to_string())
}

/// Product name snapshot on an order line.
///
/// # Errors
///
/// Returns a `FieldError` if the name is blank or longer than 200 characters.
pub fn snapshot_name(field: &str, value: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "Product name is required"));
    }
    if value.chars().count() > SNAPSHOT_NAME_MAX {
        return Err(FieldError::new(
            field,
            "Product name cannot exceed 200 characters",
        ));
    }
    Ok(value.to_string())
}

/// Any required free-text field.
///
/// # Errors
///
/// Returns a `FieldError` with `message` if the value is blank.
pub fn required(field: &str, value: &str, message: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, message));
    }
    Ok(value.to_string())
}

/// A UUID carried as a string. `label` names it mid-sentence, e.g. `product ID`.
///
/// # Errors
///
/// Returns a `FieldError` if the value is blank or not a UUID.
pub fn uuid(field: &str, value: &str, label: &str) -> Result<Uuid, FieldError> {
    if value.trim().is_empty() {
        let mut chars = label.chars();
        let capitalized: String = chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        return Err(FieldError::new(field, format!("{capitalized} is required")));
    }
    value
        .trim()
        .parse()
        .map_err(|_| FieldError::new(field, format!("Invalid {label} format: {value}")))
}

// =============================================================================
// Shared request validators
// =============================================================================

/// Validate the fields of a new catalog product.
///
/// # Errors
///
/// Returns every field error found.
pub fn new_product(name: &str, category_name: &str) -> Result<NewProduct, ValidationErrors> {
    let mut v = Validator::new();
    let name = v.check(product_name("name", name));
    let category = v.check(category("category", category_name));
    v.finish(|| {
        Some(NewProduct {
            name: name?,
            category: category?,
        })
    })
}

/// Validate the fields of a new product color.
///
/// # Errors
///
/// Returns every field error found.
pub fn new_color(code: &str, quantity: i32) -> Result<NewColor, ValidationErrors> {
    let mut v = Validator::new();
    let code = v.check(color_code("code", code));
    let stock_count = v.check(stock_quantity("existingQuantity", quantity));
    v.finish(|| {
        Some(NewColor {
            code: code?,
            stock_count: stock_count?,
        })
    })
}
