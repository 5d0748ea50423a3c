use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::store::{customer_has_orders, customer_not_found, NorthwindStore};
use crate::models::{Customer, CustomerUpdate, NewOrder, OrderChanges, OrderSummary};

const LIST_CUSTOMERS: &str = r#"
    SELECT "CustomerID", "CompanyName", "ContactName", "Country"
    FROM "Customers"
    WHERE ($1::varchar IS NULL OR "Country" = $1)
    ORDER BY "ContactName" ASC
"#;

const CUSTOMER_EXISTS: &str =
    r#"SELECT EXISTS(SELECT 1 FROM "Customers" WHERE "CustomerID" = $1)"#;

const INSERT_CUSTOMER: &str = r#"
    INSERT INTO "Customers" ("CustomerID", "CompanyName", "ContactName", "Country")
    VALUES ($1, $2, $3, $4)
"#;

const UPDATE_CUSTOMER: &str = r#"
    UPDATE "Customers"
    SET "CompanyName" = $2, "ContactName" = $3, "Country" = $4
    WHERE "CustomerID" = $1
"#;

const LOCK_CUSTOMER_FOR_UPDATE: &str =
    r#"SELECT 1 FROM "Customers" WHERE "CustomerID" = $1 FOR UPDATE"#;

const LOCK_CUSTOMER_FOR_SHARE: &str =
    r#"SELECT 1 FROM "Customers" WHERE "CustomerID" = $1 FOR SHARE"#;

const COUNT_CUSTOMER_ORDERS: &str = r#"SELECT COUNT(*) FROM "Orders" WHERE "CustomerID" = $1"#;

const DELETE_CUSTOMER: &str = r#"DELETE FROM "Customers" WHERE "CustomerID" = $1"#;

const LIST_CUSTOMER_ORDERS: &str = r#"
    SELECT o."OrderID", o."OrderDate", o."ShippedDate"
    FROM "Orders" o
    INNER JOIN "Customers" c ON o."CustomerID" = c."CustomerID"
    WHERE c."CustomerID" = $1
    ORDER BY o."ShippedDate" ASC
"#;

const ORDER_EXISTS: &str = r#"SELECT EXISTS(SELECT 1 FROM "Orders" WHERE "OrderID" = $1)"#;

const INSERT_ORDER: &str = r#"
    INSERT INTO "Orders" ("OrderID", "CustomerID", "OrderDate", "ShippedDate")
    VALUES ($1, $2, $3, $4)
"#;

const UPDATE_ORDER: &str = r#"
    UPDATE "Orders"
    SET "CustomerID" = $2, "OrderDate" = $3, "ShippedDate" = $4
    WHERE "OrderID" = $1
"#;

const DELETE_ORDER: &str = r#"DELETE FROM "Orders" WHERE "OrderID" = $1"#;

/// PostgreSQL-backed store. Each operation owns one transaction; returning
/// early with `?` drops it, which rolls it back and releases the connection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        Ok(self.pool.begin().await?)
    }
}

#[async_trait]
impl NorthwindStore for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_customers(&self, country: Option<&str>) -> Result<Vec<Customer>, DatabaseError> {
        let mut tx = self.begin().await?;
        let customers = sqlx::query_as::<_, Customer>(LIST_CUSTOMERS)
            .bind(country)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Listed {} customers (country={:?})", customers.len(), country);
        Ok(customers)
    }

    async fn customer_exists(&self, customer_id: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.begin().await?;
        let (exists,): (bool,) = sqlx::query_as(CUSTOMER_EXISTS)
            .bind(customer_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(exists)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), DatabaseError> {
        let mut tx = self.begin().await?;
        sqlx::query(INSERT_CUSTOMER)
            .bind(&customer.customer_id)
            .bind(&customer.company_name)
            .bind(&customer.contact_name)
            .bind(&customer.country)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_customer(
        &self,
        customer_id: &str,
        update: &CustomerUpdate,
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(UPDATE_CUSTOMER)
            .bind(customer_id)
            .bind(&update.company_name)
            .bind(&update.contact_name)
            .bind(&update.country)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<u64, DatabaseError> {
        let mut tx = self.begin().await?;

        // Hold the customer row so no order can be attached between the check and the delete
        sqlx::query(LOCK_CUSTOMER_FOR_UPDATE)
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (orders,): (i64,) = sqlx::query_as(COUNT_CUSTOMER_ORDERS)
            .bind(customer_id)
            .fetch_one(&mut *tx)
            .await?;
        if orders > 0 {
            return Err(customer_has_orders(customer_id, orders));
        }

        let result = sqlx::query(DELETE_CUSTOMER)
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn list_customer_orders(&self, customer_id: &str) -> Result<Vec<OrderSummary>, DatabaseError> {
        let mut tx = self.begin().await?;
        let orders = sqlx::query_as::<_, OrderSummary>(LIST_CUSTOMER_ORDERS)
            .bind(customer_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!("Listed {} orders for customer {}", orders.len(), customer_id);
        Ok(orders)
    }

    async fn order_exists(&self, order_id: i32) -> Result<bool, DatabaseError> {
        let mut tx = self.begin().await?;
        let (exists,): (bool,) = sqlx::query_as(ORDER_EXISTS)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(exists)
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<(), DatabaseError> {
        let mut tx = self.begin().await?;

        // FOR SHARE keeps the customer from being deleted until we commit
        let customer = sqlx::query(LOCK_CUSTOMER_FOR_SHARE)
            .bind(&order.fields.customer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if customer.is_none() {
            return Err(customer_not_found(&order.fields.customer_id));
        }

        sqlx::query(INSERT_ORDER)
            .bind(order.order_id)
            .bind(&order.fields.customer_id)
            .bind(order.fields.order_date)
            .bind(order.fields.shipped_date)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order_id: i32, changes: &OrderChanges) -> Result<u64, DatabaseError> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(UPDATE_ORDER)
            .bind(order_id)
            .bind(&changes.customer_id)
            .bind(changes.order_date)
            .bind(changes.shipped_date)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn delete_order(&self, order_id: i32) -> Result<u64, DatabaseError> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(DELETE_ORDER)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
