//! Product catalog route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stocks_core::{ColorId, ProductCategory, ProductId};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{ProductColor, ProductUpdate, StockAdjustment};
use crate::state::AppState;
use crate::validation::{self, Validator};

// =============================================================================
// Request / response bodies
// =============================================================================

/// Body of `POST /api/product`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
}

/// Body of `PUT /api/product/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditProductRequest {
    pub name: String,
    pub category: String,
    /// Color whose stock to adjust.
    pub color_id: Option<ColorId>,
    /// Units to add to the color's stock (negative to remove).
    pub quantity_to_add: Option<i32>,
}

/// Body of `POST /api/product/{id}/colors`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddColorRequest {
    pub code: String,
    pub existing_quantity: i32,
}

/// Query of `GET /api/product/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetProductQuery {
    pub include_colors: bool,
}

#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    pub id: ProductId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedColor {
    pub color_id: ColorId,
}

/// A color as returned after a stock adjustment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustedColor {
    pub id: ColorId,
    pub code: String,
    pub stock_count: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedProductResponse {
    pub id: ProductId,
    pub name: String,
    pub category: ProductCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<AdjustedColor>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    pub color_id: ColorId,
    pub code: String,
    pub stock_count: i32,
}

impl From<ProductColor> for ColorInfo {
    fn from(color: ProductColor) -> Self {
        Self {
            color_id: color.id,
            code: color.code,
            stock_count: color.stock_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub category: ProductCategory,
    /// Present only when `includeColors=true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<ColorInfo>>,
}

/// One row of the flattened product/color listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: ProductCategory,
    pub color_id: Option<ColorId>,
    pub color_code: Option<String>,
    pub stock_count: i32,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub items: Vec<ProductItem>,
}

fn product_not_found(id: ProductId) -> AppError {
    AppError::NotFound(format!("Product with ID {id} not found."))
}

fn color_not_found(color_id: ColorId, product_name: &str) -> AppError {
    AppError::NotFound(format!(
        "Color with ID {color_id} not found for product {product_name}."
    ))
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a product with no colors.
#[instrument(skip(state, body), fields(name = %body.name))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProductRequest>,
) -> Result<Json<CreatedProduct>, AppError> {
    let product = validation::new_product(&body.name, &body.category)?;

    if state.store().product_name_exists(&product.name, None).await? {
        return Err(AppError::Conflict(
            "Product with the same name already exists.".to_string(),
        ));
    }

    let product = state.store().insert_product(&product).await?;
    tracing::info!(product_id = %product.id, "Product created");

    Ok(Json(CreatedProduct { id: product.id }))
}

/// Rename or recategorize a product, optionally adjusting one color's stock.
#[instrument(skip(state, body))]
pub async fn edit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<EditProductRequest>,
) -> Result<Json<EditedProductResponse>, AppError> {
    let mut v = Validator::new();
    let name = v.check(validation::product_name("name", &body.name));
    let category = v.check(validation::category("category", &body.category));
    let delta = body.quantity_to_add.unwrap_or(0);
    if delta != 0 && body.color_id.is_none() {
        v.error("colorId", "A color must be selected to adjust stock");
    }
    let update = v.finish(|| {
        Some(ProductUpdate {
            name: name?,
            category: category?,
            stock: body
                .color_id
                .map(|color_id| StockAdjustment { color_id, delta }),
        })
    })?;

    let store = state.store();
    if store.find_product(id).await?.is_none() {
        return Err(product_not_found(id));
    }
    if store.product_name_exists(&update.name, Some(id)).await? {
        return Err(AppError::Conflict(
            "A product with this name already exists".to_string(),
        ));
    }

    let edited = store.update_product(id, &update).await?;
    if let Some(color) = &edited.color {
        tracing::info!(
            product_id = %id,
            color_id = %color.id,
            delta,
            stock_count = color.stock_count,
            "Stock adjusted"
        );
    }

    Ok(Json(EditedProductResponse {
        id: edited.product.id,
        name: edited.product.name,
        category: edited.product.category,
        color: edited.color.map(|c| AdjustedColor {
            id: c.id,
            code: c.code,
            stock_count: c.stock_count,
        }),
    }))
}

/// Fetch one product, with its colors when asked.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiQuery(query): ApiQuery<GetProductQuery>,
) -> Result<Json<ProductResponse>, AppError> {
    let response = if query.include_colors {
        let found = state
            .store()
            .find_product_with_colors(id)
            .await?
            .ok_or_else(|| product_not_found(id))?;
        ProductResponse {
            id: found.product.id,
            name: found.product.name,
            category: found.product.category,
            colors: Some(found.colors.into_iter().map(ColorInfo::from).collect()),
        }
    } else {
        let product = state
            .store()
            .find_product(id)
            .await?
            .ok_or_else(|| product_not_found(id))?;
        ProductResponse {
            id: product.id,
            name: product.name,
            category: product.category,
            colors: None,
        }
    };

    Ok(Json(response))
}

/// Delete a product and its colors.
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode, AppError> {
    if !state.store().delete_product(id).await? {
        return Err(product_not_found(id));
    }
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Add a color to a product.
#[instrument(skip(state, body), fields(code = %body.code))]
pub async fn add_color(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<AddColorRequest>,
) -> Result<Json<CreatedColor>, AppError> {
    let color = validation::new_color(&body.code, body.existing_quantity)?;

    let product = state
        .store()
        .find_product_with_colors(id)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    if product.has_color_code(&color.code) {
        return Err(AppError::Conflict(format!(
            "Color with code '{}' already exists for this product.",
            color.code
        )));
    }

    let color = state.store().insert_color(id, &color).await?;
    Ok(Json(CreatedColor { color_id: color.id }))
}

/// Remove one color from a product.
#[instrument(skip(state))]
pub async fn delete_color(
    State(state): State<AppState>,
    ApiPath((id, color_id)): ApiPath<(ProductId, ColorId)>,
) -> Result<StatusCode, AppError> {
    let product = state
        .store()
        .find_product_with_colors(id)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    if product.color(color_id).is_none() {
        return Err(color_not_found(color_id, &product.product.name));
    }

    if !state.store().delete_color(id, color_id).await? {
        return Err(color_not_found(color_id, &product.product.name));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Flattened product/color listing: one row per color, or one empty row for
/// a product without colors.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<ProductListResponse>, AppError> {
    let products = state.store().list_products().await?;

    let items = products
        .into_iter()
        .flat_map(|entry| {
            let product = entry.product;
            if entry.colors.is_empty() {
                return vec![ProductItem {
                    product_id: product.id,
                    product_name: product.name,
                    category: product.category,
                    color_id: None,
                    color_code: None,
                    stock_count: 0,
                }];
            }
            entry
                .colors
                .into_iter()
                .map(|color| ProductItem {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    category: product.category,
                    color_id: Some(color.id),
                    color_code: Some(color.code),
                    stock_count: color.stock_count,
                })
                .collect()
        })
        .collect();

    Ok(Json(ProductListResponse { items }))
}
