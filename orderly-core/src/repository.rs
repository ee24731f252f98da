use async_trait::async_trait;
use orderly_shared::{NewOrder, Order, OrderId, OrderUpdate};
use rust_decimal::Decimal;

use crate::error::PersistenceError;

/// Durable storage for orders.
///
/// Operations that target a single row return [`PersistenceError::NotFound`]
/// when no row matched.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a pending order and return it with its assigned id.
    async fn insert_order(
        &self,
        order: &NewOrder,
        total_price: Decimal,
    ) -> Result<Order, PersistenceError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, PersistenceError>;

    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, PersistenceError>;

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, PersistenceError>;

    async fn update_status(&self, id: OrderId, status: &str) -> Result<(), PersistenceError>;

    async fn delete_order(&self, id: OrderId) -> Result<(), PersistenceError>;
}
