//! Notification service: receives order events and records deliveries.

pub mod handlers;
pub mod store;

pub use handlers::{router, NotificationsState};
pub use store::{Notification, NotificationStore};
