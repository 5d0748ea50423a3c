#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use northwind_api::config::{AppConfig, Environment};
use northwind_api::database::{MemoryStore, NorthwindStore};
use northwind_api::{app, AppState};

/// The real router served on a local port for the duration of one test
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(store: Arc<dyn NorthwindStore>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        let config = AppConfig::for_environment(Environment::Development);
        let router = app(AppState::new(store), &config);
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            handle,
        })
    }

    /// Server over a fresh in-memory store; the store is returned for inspection
    pub async fn in_memory() -> Result<(Self, Arc<MemoryStore>)> {
        let store = Arc::new(MemoryStore::new());
        let server = Self::start(store.clone()).await?;
        Ok((server, store))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        read(res).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).json(&body).send().await?;
        read(res).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.put(self.url(path)).json(&body).send().await?;
        read(res).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.delete(self.url(path)).send().await?;
        read(res).await
    }

    pub async fn create_customer(
        &self,
        id: &str,
        company: &str,
        contact: Option<&str>,
        country: Option<&str>,
    ) -> Result<()> {
        let (status, body) = self
            .post(
                "/customers",
                json!({
                    "customerId": id,
                    "companyName": company,
                    "contactName": contact,
                    "country": country
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create customer {} failed: {} {}", id, status, body);
        Ok(())
    }

    pub async fn create_order(
        &self,
        order_id: i32,
        customer_id: &str,
        shipped_date: Option<&str>,
    ) -> Result<()> {
        let (status, body) = self
            .post(
                "/orders",
                json!({
                    "orderId": order_id,
                    "customerId": customer_id,
                    "orderDate": "1997-01-01T00:00:00",
                    "shippedDate": shipped_date
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create order {} failed: {} {}", order_id, status, body);
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = res.status();
    let text = res.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
    };
    Ok((status, body))
}

/// `customerId` of every element in a customer list body
pub fn customer_ids(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("customerId").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `orderId` of every element in an order list body
pub fn order_ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|o| o.get("orderId").and_then(Value::as_i64))
                .collect()
        })
        .unwrap_or_default()
}
