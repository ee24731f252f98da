pub mod events;
pub mod inventory;
pub mod order;
