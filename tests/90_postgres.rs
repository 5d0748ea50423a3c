//! Runs the HTTP surface against a real PostgreSQL database.
//! Requires DATABASE_URL and `cargo test --features db_tests`.
#![cfg(feature = "db_tests")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;
use sqlx::{Executor, PgPool};

use common::{customer_ids, order_ids, TestServer};
use northwind_api::database::{DatabaseError, NorthwindStore, PgStore};
use northwind_api::models::{NewOrder, OrderChanges};

const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Ids unique to this test process so parallel runs don't collide
struct Fixture {
    customer: String,
    first_order: i32,
}

impl Fixture {
    fn new(prefix: char) -> Self {
        let pid = std::process::id() % 10_000;
        Self {
            customer: format!("{}{:04}", prefix, pid),
            first_order: 1_000_000 + (pid as i32) * 100 + (prefix as i32 % 10) * 10,
        }
    }
}

async fn setup(fixture: &Fixture) -> Result<(TestServer, PgPool)> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set for db_tests")?;
    let pool = PgPool::connect(&url).await?;
    pool.execute(SCHEMA).await?;

    sqlx::query(r#"DELETE FROM "Orders" WHERE "CustomerID" = $1"#)
        .bind(&fixture.customer)
        .execute(&pool)
        .await?;
    sqlx::query(r#"DELETE FROM "Customers" WHERE "CustomerID" = $1"#)
        .bind(&fixture.customer)
        .execute(&pool)
        .await?;

    let server = TestServer::start(Arc::new(PgStore::new(pool.clone()))).await?;
    Ok((server, pool))
}

async fn count_orders(pool: &PgPool, customer_id: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "Orders" WHERE "CustomerID" = $1"#)
        .bind(customer_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

async fn count_orphan_orders(pool: &PgPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM "Orders" o
           LEFT JOIN "Customers" c ON o."CustomerID" = c."CustomerID"
           WHERE c."CustomerID" IS NULL"#,
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

fn new_order(order_id: i32, customer_id: &str) -> NewOrder {
    NewOrder {
        order_id,
        fields: OrderChanges {
            customer_id: customer_id.to_string(),
            order_date: None,
            shipped_date: None,
        },
    }
}

/// Time given to a racing store call to reach its row lock
const LOCK_WAIT: Duration = Duration::from_millis(300);

#[tokio::test]
async fn customer_lifecycle() -> Result<()> {
    let fixture = Fixture::new('C');
    let (server, _) = setup(&fixture).await?;
    let id = fixture.customer.as_str();

    server.create_customer(id, "Alfreds", Some("Maria"), Some("Testland")).await?;

    let (status, body) = server.get(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "exists": true }));

    let (_, body) = server.get("/customers?country=Testland").await?;
    assert!(customer_ids(&body).contains(&id.to_string()));

    let (status, _) = server
        .put(
            &format!("/customers/{}", id),
            json!({ "companyName": "Alfreds GmbH", "country": "Otherland" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.get("/customers?country=Otherland").await?;
    assert!(customer_ids(&body).contains(&id.to_string()));

    let (status, _) = server.delete(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn referential_guard_and_orders() -> Result<()> {
    let fixture = Fixture::new('O');
    let (server, pool) = setup(&fixture).await?;
    let id = fixture.customer.as_str();
    let first = fixture.first_order;

    sqlx::query(r#"DELETE FROM "Orders" WHERE "OrderID" BETWEEN $1 AND $2"#)
        .bind(first)
        .bind(first + 9)
        .execute(&pool)
        .await?;

    server.create_customer(id, "Vins et alcools", None, None).await?;
    server.create_order(first, id, None).await?;
    server.create_order(first + 1, id, Some("1996-07-16T00:00:00")).await?;

    let (_, body) = server.get(&format!("/customer/{}/orders", id)).await?;
    assert_eq!(order_ids(&body), vec![(first + 1) as i64, first as i64]);

    let (status, _) = server.delete(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(count_orders(&pool, id).await?, 2);

    let (status, _) = server
        .post("/orders", json!({ "orderId": first + 2, "customerId": "ZZ999" }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get(&format!("/orders/{}", first + 2)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .put(&format!("/orders/{}", first + 3), json!({ "customerId": id }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count_orders(&pool, id).await?, 2);

    for order in [first, first + 1] {
        let (status, _) = server.delete(&format!("/orders/{}", order)).await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = server.delete(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn order_insert_waits_for_concurrent_customer_delete() -> Result<()> {
    let fixture = Fixture::new('R');
    let (server, pool) = setup(&fixture).await?;
    let id = fixture.customer.clone();
    let order_id = fixture.first_order;

    sqlx::query(r#"DELETE FROM "Orders" WHERE "OrderID" = $1"#)
        .bind(order_id)
        .execute(&pool)
        .await?;
    server.create_customer(&id, "Richter Supermarkt", None, None).await?;

    // A deleting transaction holds the customer row
    let mut tx = pool.begin().await?;
    sqlx::query(r#"SELECT 1 FROM "Customers" WHERE "CustomerID" = $1 FOR UPDATE"#)
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;

    let store = PgStore::new(pool.clone());
    let order = new_order(order_id, &id);
    let insert = tokio::spawn(async move { store.insert_order(&order).await });

    tokio::time::sleep(LOCK_WAIT).await;
    assert!(!insert.is_finished(), "insert must block on the locked customer");

    sqlx::query(r#"DELETE FROM "Customers" WHERE "CustomerID" = $1"#)
        .bind(&id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let result = insert.await?;
    assert!(matches!(result, Err(DatabaseError::NotFound(_))), "got {:?}", result);
    assert_eq!(count_orders(&pool, &id).await?, 0);
    assert_eq!(count_orphan_orders(&pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn customer_delete_waits_for_concurrent_order_insert() -> Result<()> {
    let fixture = Fixture::new('S');
    let (server, pool) = setup(&fixture).await?;
    let id = fixture.customer.clone();
    let order_id = fixture.first_order;

    sqlx::query(r#"DELETE FROM "Orders" WHERE "OrderID" = $1"#)
        .bind(order_id)
        .execute(&pool)
        .await?;
    server.create_customer(&id, "Split Rail Beer", None, None).await?;

    // An inserting transaction holds the customer row in share mode
    let mut tx = pool.begin().await?;
    sqlx::query(r#"SELECT 1 FROM "Customers" WHERE "CustomerID" = $1 FOR SHARE"#)
        .bind(&id)
        .fetch_one(&mut *tx)
        .await?;
    sqlx::query(r#"INSERT INTO "Orders" ("OrderID", "CustomerID") VALUES ($1, $2)"#)
        .bind(order_id)
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    let store = PgStore::new(pool.clone());
    let customer = id.clone();
    let delete = tokio::spawn(async move { store.delete_customer(&customer).await });

    tokio::time::sleep(LOCK_WAIT).await;
    assert!(!delete.is_finished(), "delete must block on the shared customer lock");

    tx.commit().await?;

    let result = delete.await?;
    assert!(matches!(result, Err(DatabaseError::Conflict(_))), "got {:?}", result);
    assert_eq!(count_orders(&pool, &id).await?, 1);
    assert_eq!(count_orphan_orders(&pool).await?, 0);

    let (status, _) = server.delete(&format!("/orders/{}", order_id)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.delete(&format!("/customers/{}", id)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
