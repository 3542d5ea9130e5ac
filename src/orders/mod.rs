//! Order service: REST API over the order store, with notification fan-out.

pub mod handlers;
pub mod store;

pub use handlers::{router, OrdersState};
pub use store::{Order, OrderStore};
