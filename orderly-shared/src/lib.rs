pub mod models;

pub use models::events::{OrderCreatedEvent, StatusChangeEvent};
pub use models::inventory::{AvailabilityQuery, AvailabilityResult};
pub use models::order::{status, NewOrder, Order, OrderId, OrderUpdate};
