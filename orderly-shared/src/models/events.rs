use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::order::{Order, OrderId};

/// Sent to the notification service whenever an order's status is observed
/// to change (including deletion, reported as `cancelled`).
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct StatusChangeEvent {
    pub order_id: OrderId,
    pub customer_id: i64,
    pub status: String,
}

/// Payload published under the `order.created` routing key.
///
/// Delivery is at-least-once, so consumers should de-duplicate on `event_id`.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCreatedEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            order,
        }
    }
}
