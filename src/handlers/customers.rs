use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{customer_id_param, ApiJson, ApiMessage, ApiResponse, ApiResult, Existence};
use crate::app::AppState;
use crate::error::ApiError;
use crate::models::{Customer, CustomerUpdate};

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    /// Exact, case-sensitive country match
    pub country: Option<String>,
}

/// GET /customers?country= - List customers ordered by contact name
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Vec<Customer>> {
    let customers = state.store.list_customers(query.country.as_deref()).await?;
    Ok(ApiResponse::success(customers))
}

/// GET /customers/:id - Existence check only
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Existence> {
    let id = customer_id_param(&id)?;

    if state.store.customer_exists(id).await? {
        Ok(ApiResponse::success(Existence::found()))
    } else {
        Err(ApiError::not_found(format!("Customer {} not found", id)))
    }
}

/// POST /customers - Create a customer
pub async fn create(
    State(state): State<AppState>,
    ApiJson(customer): ApiJson<Customer>,
) -> ApiResult<ApiMessage> {
    customer.validate()?;

    state.store.insert_customer(&customer).await?;

    info!("Created customer {}", customer.customer_id);
    Ok(ApiResponse::created(ApiMessage::new("Customer created successfully")))
}

/// PUT /customers/:id - Replace company name, contact name and country
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<CustomerUpdate>,
) -> ApiResult<ApiMessage> {
    let id = customer_id_param(&id)?;
    update.validate()?;

    let rows = state.store.update_customer(id, &update).await?;
    if rows == 0 {
        debug!("Update matched no customer with id {}", id);
    }

    Ok(ApiResponse::success(ApiMessage::new("Customer updated successfully")))
}

/// DELETE /customers/:id - Delete a customer that owns no orders
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ApiMessage> {
    let id = customer_id_param(&id)?;

    let rows = state.store.delete_customer(id).await?;
    info!("Deleted customer {} ({} row(s))", id, rows);

    Ok(ApiResponse::success(ApiMessage::new("Customer deleted successfully")))
}
