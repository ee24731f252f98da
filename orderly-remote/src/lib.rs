//! HTTP clients for the services an order depends on.
//!
//! Every client owns its own circuit breaker, so a failing dependency never
//! trips the breaker of another.

mod client;
pub mod inventory;
pub mod notification;
pub mod payment;
pub mod product;

pub use inventory::InventoryClient;
pub use notification::NotificationClient;
pub use payment::{payment_breaker, PaymentClient};
pub use product::ProductClient;
