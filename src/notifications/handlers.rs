//! Notification service routes.
//!
//! # Endpoints
//! - `POST /api/notifications/send` deliver a notification
//! - `GET /api/notifications` list notifications
//! - `GET /api/notifications/{id}` fetch one notification
//! - `GET /api/notifications/order/{order_id}` notifications for an order
//! - `GET /health` liveness probe
//!
//! Delivery can fail on purpose: `simulation.failure_rate` controls how often
//! a send is rejected, which exercises the degradation path upstream.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

use crate::config::schema::SimulationConfig;
use crate::config::Config;
use crate::http::{ApiError, TraceRequestLayer};
use crate::notifications::store::{Notification, NotificationStore};
use crate::observability::HttpMetrics;

/// Shared state for the notification routes.
#[derive(Clone)]
pub struct NotificationsState {
    pub store: NotificationStore,
    pub simulation: SimulationConfig,
    pub metrics: HttpMetrics,
}

/// Inbound delivery request. Callers may omit any field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub message: Option<String>,
}

/// Build the notification service router with tracing and timeout middleware.
pub fn router(config: &Config, state: NotificationsState) -> Router {
    let trace = TraceRequestLayer::new(state.metrics.clone());
    let timeout = TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs));
    Router::new()
        .route("/api/notifications/send", post(send_notification))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}", get(get_notification))
        .route(
            "/api/notifications/order/{order_id}",
            get(notifications_for_order),
        )
        .route("/health", get(health))
        .layer(timeout)
        .layer(trace)
        .with_state(state)
}

async fn send_notification(
    State(state): State<NotificationsState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<Notification>, ApiError> {
    let notification_id = Uuid::new_v4().to_string();
    let order_id = request.order_id.unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        notification_id = %notification_id,
        order_id = %order_id,
        "sending notification"
    );

    state.simulation.apply_delay().await;

    if state.simulation.roll_failure() {
        tracing::error!(
            notification_id = %notification_id,
            order_id = %order_id,
            "notification delivery failed"
        );
        return Err(ApiError::DeliveryFailed);
    }

    let notification = Notification {
        notification_id,
        order_id,
        customer_id: request.customer_id.unwrap_or_else(|| "unknown".to_string()),
        message: request.message.unwrap_or_else(|| "No message".to_string()),
        sent_at: Utc::now(),
        status: "Sent".to_string(),
    };
    state.store.add(notification.clone()).await;

    tracing::info!(
        notification_id = %notification.notification_id,
        order_id = %notification.order_id,
        "notification sent"
    );

    Ok(Json(notification))
}

async fn list_notifications(State(state): State<NotificationsState>) -> Json<Vec<Notification>> {
    let notifications = state.store.list().await;
    tracing::info!(count = notifications.len(), "listing notifications");
    Json(notifications)
}

async fn get_notification(
    State(state): State<NotificationsState>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    tracing::info!(notification_id = %notification_id, "fetching notification");
    match state.store.get(&notification_id).await {
        Some(notification) => Ok(Json(notification)),
        None => {
            tracing::warn!(notification_id = %notification_id, "notification not found");
            Err(ApiError::NotFound("Notification"))
        }
    }
}

async fn notifications_for_order(
    State(state): State<NotificationsState>,
    Path(order_id): Path<String>,
) -> Json<Vec<Notification>> {
    let notifications = state.store.for_order(&order_id).await;
    tracing::info!(
        order_id = %order_id,
        count = notifications.len(),
        "listing notifications for order"
    );
    Json(notifications)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "service": "Notifications", "status": "healthy" }))
}
