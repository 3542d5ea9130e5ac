//! Notification storage.
//!
//! Delivered notifications are kept in process memory only; the service is
//! intentionally stateless across restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// A delivered notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

/// In-memory notification list shared across requests.
#[derive(Clone, Default)]
pub struct NotificationStore {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl NotificationStore {
    pub async fn add(&self, notification: Notification) {
        self.notifications.write().await.push(notification);
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn get(&self, notification_id: &str) -> Option<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .find(|notification| notification.notification_id == notification_id)
            .cloned()
    }

    pub async fn for_order(&self, order_id: &str) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|notification| notification.order_id == order_id)
            .cloned()
            .collect()
    }
}
