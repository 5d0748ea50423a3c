use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::store::{customer_has_orders, customer_not_found, NorthwindStore};
use crate::models::{Customer, CustomerUpdate, NewOrder, OrderChanges, OrderSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredOrder {
    customer_id: String,
    order_date: Option<NaiveDateTime>,
    shipped_date: Option<NaiveDateTime>,
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<String, Customer>,
    orders: BTreeMap<i32, StoredOrder>,
}

/// In-process store with the same semantics as the PostgreSQL schema,
/// including the primary keys and the Orders → Customers foreign key.
/// Each operation holds the table lock for its whole duration, which stands in
/// for a transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail like a lost database connection
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Total number of stored orders
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    fn check_online(&self) -> Result<(), DatabaseError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            Err(DatabaseError::QueryError("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Ascending with `None` after every value, as PostgreSQL sorts NULLs by default
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn foreign_key_violation(customer_id: &str) -> DatabaseError {
    DatabaseError::QueryError(format!(
        "insert or update on table \"Orders\" violates foreign key constraint: CustomerID={} is not present",
        customer_id
    ))
}

#[async_trait]
impl NorthwindStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check_online()
    }

    async fn list_customers(&self, country: Option<&str>) -> Result<Vec<Customer>, DatabaseError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut customers: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| country.map_or(true, |wanted| c.country.as_deref() == Some(wanted)))
            .cloned()
            .collect();
        customers.sort_by(|a, b| nulls_last(&a.contact_name, &b.contact_name));
        Ok(customers)
    }

    async fn customer_exists(&self, customer_id: &str) -> Result<bool, DatabaseError> {
        self.check_online()?;
        Ok(self.tables.read().await.customers.contains_key(customer_id))
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if tables.customers.contains_key(&customer.customer_id) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate key value violates unique constraint \"PK_Customers\": {}",
                customer.customer_id
            )));
        }
        tables
            .customers
            .insert(customer.customer_id.clone(), customer.clone());
        Ok(())
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        update: &CustomerUpdate,
    ) -> Result<u64, DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        match tables.customers.get_mut(customer_id) {
            Some(customer) => {
                customer.apply(update);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<u64, DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .count() as i64;
        if orders > 0 {
            return Err(customer_has_orders(customer_id, orders));
        }
        Ok(tables.customers.remove(customer_id).map_or(0, |_| 1))
    }

    async fn list_customer_orders(&self, customer_id: &str) -> Result<Vec<OrderSummary>, DatabaseError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        if !tables.customers.contains_key(customer_id) {
            return Ok(Vec::new());
        }
        let mut orders: Vec<OrderSummary> = tables
            .orders
            .iter()
            .filter(|(_, o)| o.customer_id == customer_id)
            .map(|(id, o)| OrderSummary {
                order_id: *id,
                order_date: o.order_date,
                shipped_date: o.shipped_date,
            })
            .collect();
        orders.sort_by(|a, b| nulls_last(&a.shipped_date, &b.shipped_date));
        Ok(orders)
    }

    async fn order_exists(&self, order_id: i32) -> Result<bool, DatabaseError> {
        self.check_online()?;
        Ok(self.tables.read().await.orders.contains_key(&order_id))
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<(), DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&order.fields.customer_id) {
            return Err(customer_not_found(&order.fields.customer_id));
        }
        if tables.orders.contains_key(&order.order_id) {
            return Err(DatabaseError::QueryError(format!(
                "duplicate key value violates unique constraint \"PK_Orders\": {}",
                order.order_id
            )));
        }
        tables.orders.insert(
            order.order_id,
            StoredOrder {
                customer_id: order.fields.customer_id.clone(),
                order_date: order.fields.order_date,
                shipped_date: order.fields.shipped_date,
            },
        );
        Ok(())
    }

    async fn update_order(&self, order_id: i32, changes: &OrderChanges) -> Result<u64, DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&order_id) {
            return Ok(0);
        }
        if !tables.customers.contains_key(&changes.customer_id) {
            return Err(foreign_key_violation(&changes.customer_id));
        }
        if let Some(order) = tables.orders.get_mut(&order_id) {
            order.customer_id = changes.customer_id.clone();
            order.order_date = changes.order_date;
            order.shipped_date = changes.shipped_date;
        }
        Ok(1)
    }

    async fn delete_order(&self, order_id: i32) -> Result<u64, DatabaseError> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        Ok(tables.orders.remove(&order_id).map_or(0, |_| 1))
    }
}
