//! Order route handlers.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stocks_core::{ColorId, OrderId, OrderItemId, PageRequest, ProductCategory, ProductId};

use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CurrentCaller;
use crate::models::{NewOrder, NewOrderLine, Order, OrderItem};
use crate::state::AppState;
use crate::validation::{self, ValidationErrors, Validator};

const ORDER_SAVED: &str = "Order saved successfully and stock updated";

// =============================================================================
// Request / response bodies
// =============================================================================

/// Body of `POST /api/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveOrderRequest {
    pub client_name: String,
    pub items: Vec<OrderItemRequest>,
}

/// One line of a new order. Ids and category arrive as strings and are
/// checked during validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: String,
    pub color_id: String,
    pub product_name: String,
    pub category: String,
    pub color_code: String,
    pub quantity: i32,
}

impl SaveOrderRequest {
    /// Check every field, reporting all problems at once.
    fn validate(&self, created_by: Option<String>) -> Result<NewOrder, ValidationErrors> {
        let mut v = Validator::new();
        let client_name = v.check(validation::client_name("clientName", &self.client_name));
        if self.items.is_empty() {
            v.error("items", "At least one order item is required");
        }

        let lines: Vec<Option<NewOrderLine>> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let field = |name: &str| format!("items[{i}].{name}");
                let product_id = v.check(validation::uuid(
                    &field("productId"),
                    &item.product_id,
                    "product ID",
                ));
                let color_id =
                    v.check(validation::uuid(&field("colorId"), &item.color_id, "color ID"));
                let product_name =
                    v.check(validation::snapshot_name(&field("productName"), &item.product_name));
                let category = v.check(validation::category(&field("category"), &item.category));
                let color_code = v.check(validation::required(
                    &field("colorCode"),
                    &item.color_code,
                    "Color code is required",
                ));
                let quantity = v.check(validation::order_quantity(&field("quantity"), item.quantity));

                Some(NewOrderLine {
                    product_id: ProductId::new(product_id?),
                    color_id: ColorId::new(color_id?),
                    product_name: product_name?,
                    category: category?,
                    color_code: color_code?,
                    quantity: quantity?,
                })
            })
            .collect();

        v.finish(|| {
            Some(NewOrder {
                client_name: client_name?,
                created_by,
                lines: lines.into_iter().collect::<Option<Vec<_>>>()?,
            })
        })
    }
}

/// Query of `GET /api/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOrderResponse {
    pub order_id: OrderId,
    pub message: &'static str,
}

/// One order in the paged listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub order_id: OrderId,
    pub client_name: String,
    pub order_date: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl From<Order> for OrderRow {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            client_name: order.client_name,
            order_date: order.created_at,
            created_by: order.created_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersResponse {
    pub items: Vec<OrderRow>,
    pub total_count: i64,
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetail {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub color_id: ColorId,
    pub product_name: String,
    pub category: ProductCategory,
    pub color_code: String,
    pub quantity: i32,
}

impl From<OrderItem> for OrderItemDetail {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            color_id: item.color_id,
            product_name: item.product_name,
            category: item.category,
            color_code: item.color_code,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailsResponse {
    pub order_id: OrderId,
    pub client_name: String,
    pub order_date: DateTime<Utc>,
    pub created_by: Option<String>,
    pub items: Vec<OrderItemDetail>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Save an order and take its quantities out of stock.
///
/// Quantities beyond what's in stock are accepted: the color drops to zero
/// and a warning is logged.
#[instrument(skip(state, caller, body), fields(client = %body.client_name, lines = body.items.len()))]
pub async fn save(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    ApiJson(body): ApiJson<SaveOrderRequest>,
) -> Result<Json<SaveOrderResponse>, AppError> {
    let created_by = caller.as_ref().map(|c| c.identity().to_string());
    let order = body.validate(created_by)?;

    let placed = state.store().place_order(&order).await?;

    for line in placed.fulfilments.iter().filter(|l| l.fulfilment.is_oversold()) {
        tracing::warn!(
            product = %line.product_name,
            color = %line.color_code,
            available = line.fulfilment.previous,
            requested = line.requested,
            shortfall = line.fulfilment.shortfall,
            "Insufficient stock, color set to zero"
        );
    }

    let order_id = placed.order.order.id;
    tracing::info!(%order_id, "Order saved");

    Ok(Json(SaveOrderResponse {
        order_id,
        message: ORDER_SAVED,
    }))
}

/// One page of orders, newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<Json<ListOrdersResponse>, AppError> {
    let page = PageRequest::clamped(query.page_number, query.page_size);
    let result = state.store().list_orders(page).await?;

    Ok(Json(ListOrdersResponse {
        items: result.orders.into_iter().map(OrderRow::from).collect(),
        total_count: result.total_count,
        page_number: page.page_number(),
        page_size: page.page_size(),
        total_pages: page.total_pages(result.total_count),
    }))
}

/// One order with its items.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetailsResponse>, AppError> {
    let found = state
        .store()
        .find_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with ID {id} not found.")))?;

    Ok(Json(OrderDetailsResponse {
        order_id: found.order.id,
        client_name: found.order.client_name,
        order_date: found.order.created_at,
        created_by: found.order.created_by,
        items: found.items.into_iter().map(OrderItemDetail::from).collect(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item() -> OrderItemRequest {
        OrderItemRequest {
            product_id: "7f1e2a9c-3b4d-4e5f-8a6b-1c2d3e4f5a6b".to_string(),
            color_id: "0a1b2c3d-4e5f-4a6b-9c8d-7e6f5a4b3c2d".to_string(),
            product_name: "Cotton Yarn".to_string(),
            category: "KnittingThreads".to_string(),
            color_code: "RED01".to_string(),
            quantity: 2,
        }
    }

    #[test]
    fn test_valid_order() {
        let request = SaveOrderRequest {
            client_name: "Ana".to_string(),
            items: vec![item()],
        };
        let order = request.validate(Some("dana".to_string())).unwrap();
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].category, ProductCategory::KnittingThreads);
        assert_eq!(order.created_by.as_deref(), Some("dana"));
    }

    #[test]
    fn test_every_bad_field_is_reported() {
        let mut bad = item();
        bad.product_id = "not-a-uuid".to_string();
        bad.category = "Hats".to_string();
        bad.quantity = 0;
        let request = SaveOrderRequest {
            client_name: String::new(),
            items: vec![item(), bad],
        };

        let errors = request.validate(None).unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "clientName",
                "items[1].productId",
                "items[1].category",
                "items[1].quantity"
            ]
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        let request = SaveOrderRequest {
            client_name: "Ana".to_string(),
            items: Vec::new(),
        };
        let errors = request.validate(None).unwrap_err();
        assert_eq!(errors.errors()[0].field, "items");
    }
}
