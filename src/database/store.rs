use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::models::{Customer, CustomerUpdate, NewOrder, OrderChanges, OrderSummary};

/// Data access for the Customers/Orders resources.
///
/// Every method is one unit of work: implementations run it inside a single
/// transaction that is committed on success and rolled back on any error.
/// Mutations return the number of rows they touched.
#[async_trait]
pub trait NorthwindStore: Send + Sync {
    /// Cheap connectivity check used by `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Customers whose country equals `country` exactly (all when `None`),
    /// ordered by contact name with missing names last
    async fn list_customers(&self, country: Option<&str>) -> Result<Vec<Customer>, DatabaseError>;

    async fn customer_exists(&self, customer_id: &str) -> Result<bool, DatabaseError>;

    /// Plain insert. A duplicate id is a store failure.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError>;

    async fn update_customer(
        &self,
        customer_id: &str,
        update: &CustomerUpdate,
    ) -> Result<u64, DatabaseError>;

    /// Fails with [`DatabaseError::Conflict`] while any order references the
    /// customer. Deleting an unknown id is not an error.
    async fn delete_customer(&self, customer_id: &str) -> Result<u64, DatabaseError>;

    /// Orders of one customer ordered by shipped date with unshipped last
    async fn list_customer_orders(&self, customer_id: &str) -> Result<Vec<OrderSummary>, DatabaseError>;

    async fn order_exists(&self, order_id: i32) -> Result<bool, DatabaseError>;

    /// Fails with [`DatabaseError::NotFound`] when the customer does not exist
    async fn insert_order(&self, order: &NewOrder) -> Result<(), DatabaseError>;

    async fn update_order(&self, order_id: i32, changes: &OrderChanges) -> Result<u64, DatabaseError>;

    async fn delete_order(&self, order_id: i32) -> Result<u64, DatabaseError>;
}

pub(crate) fn customer_has_orders(customer_id: &str, orders: i64) -> DatabaseError {
    DatabaseError::Conflict(format!(
        "Customer {} cannot be deleted: it has {} associated order(s)",
        customer_id, orders
    ))
}

pub(crate) fn customer_not_found(customer_id: &str) -> DatabaseError {
    DatabaseError::NotFound(format!("Customer {} not found", customer_id))
}
