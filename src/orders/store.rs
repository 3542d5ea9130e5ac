//! Order persistence.
//!
//! Orders live in Postgres when `database.url` is configured, and in process
//! memory otherwise. Both backends sit behind [`OrderStore`] so the handlers
//! never know which one they talk to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::schema::DatabaseConfig;
use crate::http::ApiError;

/// A stored order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub total: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// New order in the initial `Pending` state.
    pub fn new(customer_id: String, total: f64) -> Self {
        Self {
            order_id: Uuid::new_v4().to_string(),
            customer_id,
            total,
            status: "Pending".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

/// Order storage backend, selected from configuration at startup.
#[derive(Clone)]
pub enum OrderStore {
    Memory(MemoryOrderStore),
    Postgres(PgOrderStore),
}

impl OrderStore {
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        match &config.url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await?;
                let store = PgOrderStore { pool };
                store.init_schema().await?;
                tracing::info!("order store backed by postgres");
                Ok(OrderStore::Postgres(store))
            }
            None => {
                tracing::info!("order store backed by process memory");
                Ok(OrderStore::Memory(MemoryOrderStore::default()))
            }
        }
    }

    pub async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        match self {
            OrderStore::Memory(store) => Ok(store.insert(order).await),
            OrderStore::Postgres(store) => store.insert(order).await,
        }
    }

    pub async fn list(&self) -> Result<Vec<Order>, StoreError> {
        match self {
            OrderStore::Memory(store) => Ok(store.list().await),
            OrderStore::Postgres(store) => store.list().await,
        }
    }

    pub async fn get(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        match self {
            OrderStore::Memory(store) => Ok(store.get(order_id).await),
            OrderStore::Postgres(store) => store.get(order_id).await,
        }
    }

    pub async fn update_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> Result<Option<Order>, StoreError> {
        match self {
            OrderStore::Memory(store) => Ok(store.update_status(order_id, status).await),
            OrderStore::Postgres(store) => store.update_status(order_id, status).await,
        }
    }
}

/// In-memory order list, for running without a database.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl MemoryOrderStore {
    async fn insert(&self, order: Order) -> Order {
        self.orders.write().await.push(order.clone());
        order
    }

    async fn list(&self) -> Vec<Order> {
        self.orders.read().await.clone()
    }

    async fn get(&self, order_id: &str) -> Option<Order> {
        self.orders
            .read()
            .await
            .iter()
            .find(|order| order.order_id == order_id)
            .cloned()
    }

    async fn update_status(&self, order_id: &str, status: &str) -> Option<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.iter_mut().find(|order| order.order_id == order_id)?;
        order.status = status.to_string();
        Some(order.clone())
    }
}

/// Postgres-backed store. The schema is created on startup so a fresh
/// database works without a migration step.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                total DOUBLE PRECISION NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        sqlx::query(
            "INSERT INTO orders (order_id, customer_id, total, status, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&order.order_id)
        .bind(&order.customer_id)
        .bind(order.total)
        .bind(&order.status)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT order_id, customer_id, total, status, created_at
             FROM orders ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT order_id, customer_id, total, status, created_at
             FROM orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: &str,
    ) -> Result<Option<Order>, StoreError> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $2 WHERE order_id = $1
             RETURNING order_id, customer_id, total, status, created_at",
        )
        .bind(order_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }
}
