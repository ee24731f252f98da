//! Seams for the remote services an order workflow consults.

use async_trait::async_trait;
use orderly_shared::{AvailabilityResult, OrderId, StatusChangeEvent};
use rust_decimal::Decimal;

use crate::error::DependencyError;

#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn check_availability(
        &self,
        product_id: i64,
        quantity: i32,
    ) -> Result<AvailabilityResult, DependencyError>;
}

#[async_trait]
pub trait PriceLookup: Send + Sync {
    /// Current unit price of a product.
    async fn unit_price(&self, product_id: i64) -> Result<Decimal, DependencyError>;
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify_order_created(&self, order_id: OrderId) -> Result<(), DependencyError>;

    async fn notify_status_changed(&self, event: &StatusChangeEvent) -> Result<(), DependencyError>;
}
