use axum::extract::{Path, State};
use tracing::{debug, info};

use crate::api::{
    customer_id_param, order_id_param, ApiJson, ApiMessage, ApiResponse, ApiResult, Existence,
};
use crate::app::AppState;
use crate::error::ApiError;
use crate::models::{OrderCreateRequest, OrderSummary, OrderUpdateRequest};

/// GET /customer/:id/orders - Orders of one customer by shipped date
pub async fn list_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Vec<OrderSummary>> {
    let customer_id = customer_id_param(&customer_id)?;
    let orders = state.store.list_customer_orders(customer_id).await?;
    Ok(ApiResponse::success(orders))
}

/// GET /orders/:id - Existence check only
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Existence> {
    let id = order_id_param(&id)?;

    if state.store.order_exists(id).await? {
        Ok(ApiResponse::success(Existence::found()))
    } else {
        Err(ApiError::not_found(format!("Order {} not found", id)))
    }
}

/// POST /orders - Create an order for an existing customer
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderCreateRequest>,
) -> ApiResult<ApiMessage> {
    let order = request.into_new_order()?;

    state.store.insert_order(&order).await?;

    info!("Created order {} for customer {}", order.order_id, order.fields.customer_id);
    Ok(ApiResponse::created(ApiMessage::new("Order created successfully")))
}

/// PUT /orders/:id - Replace customer, order date and shipped date
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<OrderUpdateRequest>,
) -> ApiResult<ApiMessage> {
    let id = order_id_param(&id)?;
    let changes = request.into_changes()?;

    let rows = state.store.update_order(id, &changes).await?;
    if rows == 0 {
        debug!("Update matched no order with id {}", id);
    }

    Ok(ApiResponse::success(ApiMessage::new("Order updated successfully")))
}

/// DELETE /orders/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ApiMessage> {
    let id = order_id_param(&id)?;

    let rows = state.store.delete_order(id).await?;
    info!("Deleted order {} ({} row(s))", id, rows);

    Ok(ApiResponse::success(ApiMessage::new("Order deleted successfully")))
}
