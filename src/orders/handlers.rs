//! Order service routes.
//!
//! # Endpoints
//! - `POST /api/orders` create an order, then notify the notifications service
//! - `GET /api/orders` list orders
//! - `GET /api/orders/{id}` fetch one order
//! - `PATCH /api/orders/{id}/status` update an order's status
//! - `GET /health` liveness probe
//!
//! # Design Decisions
//! - Notification delivery is best-effort: failures are logged and the order
//!   request still succeeds

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::timeout::TimeoutLayer;

use crate::config::schema::SimulationConfig;
use crate::config::Config;
use crate::http::{ApiError, TraceRequestLayer, TracedClient};
use crate::observability::HttpMetrics;
use crate::orders::store::{Order, OrderStore};

/// Shared state for the order routes.
#[derive(Clone)]
pub struct OrdersState {
    pub store: Arc<OrderStore>,
    pub client: TracedClient,
    pub notifications_url: String,
    pub simulation: SimulationConfig,
    pub metrics: HttpMetrics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub total: f64,
}

/// Payload sent to the notifications service after an order is stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderNotification<'a> {
    order_id: &'a str,
    customer_id: &'a str,
    message: &'a str,
}

/// Build the order service router with tracing and timeout middleware.
pub fn router(config: &Config, state: OrdersState) -> Router {
    let trace = TraceRequestLayer::new(state.metrics.clone());
    let timeout = TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs));
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", patch(update_status))
        .route("/health", get(health))
        .layer(timeout)
        .layer(trace)
        .with_state(state)
}

async fn create_order(
    State(state): State<OrdersState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.customer_id.trim().is_empty() {
        return Err(ApiError::Validation("customerId is required".to_string()));
    }

    tracing::info!(
        customer_id = %request.customer_id,
        total = request.total,
        "creating order"
    );

    let order = state
        .store
        .insert(Order::new(request.customer_id, request.total))
        .await?;
    state.simulation.apply_delay().await;

    notify_order_created(&state, &order).await;

    tracing::info!(order_id = %order.order_id, "order created");

    let location = format!("/api/orders/{}", order.order_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(order),
    ))
}

/// Tell the notifications service about a new order. Delivery problems are
/// logged and absorbed; order creation never fails on them.
async fn notify_order_created(state: &OrdersState, order: &Order) {
    let payload = OrderNotification {
        order_id: &order.order_id,
        customer_id: &order.customer_id,
        message: "Order created successfully",
    };
    let url = format!("{}/api/notifications/send", state.notifications_url);
    match state.client.post_json(&url, &payload).await {
        Ok(response) if response.status().is_success() => {
            tracing::info!(order_id = %order.order_id, "notification sent");
        }
        Ok(response) => {
            tracing::warn!(
                order_id = %order.order_id,
                status = response.status().as_u16(),
                "notification delivery failed"
            );
        }
        Err(err) => {
            tracing::error!(
                order_id = %order.order_id,
                error = %err,
                "notification request error"
            );
        }
    }
}

async fn list_orders(State(state): State<OrdersState>) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.store.list().await?;
    tracing::info!(count = orders.len(), "listing orders");
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<OrdersState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    match state.store.get(&order_id).await? {
        Some(order) => Ok(Json(order)),
        None => {
            tracing::warn!(order_id = %order_id, "order not found");
            Err(ApiError::NotFound("Order"))
        }
    }
}

async fn update_status(
    State(state): State<OrdersState>,
    Path(order_id): Path<String>,
    Json(body): Json<HashMap<String, String>>,
) -> Result<Json<Order>, ApiError> {
    let status = body
        .get("status")
        .cloned()
        .unwrap_or_else(|| "Pending".to_string());

    let updated = state.store.update_status(&order_id, &status).await?;
    state.simulation.apply_delay().await;

    match updated {
        Some(order) => {
            tracing::info!(order_id = %order_id, status = %status, "order status updated");
            Ok(Json(order))
        }
        None => {
            tracing::warn!(order_id = %order_id, "order not found");
            Err(ApiError::NotFound("Order"))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "service": "Orders", "status": "healthy" }))
}
