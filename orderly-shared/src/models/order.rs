use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type OrderId = i64;

/// Status values the order service knows about.
///
/// The status column is free text: these are the values the service itself
/// writes or that downstream consumers are known to send, not a closed set.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const PROCESSING: &str = "processing";
    pub const SHIPPED: &str = "shipped";
    pub const DELIVERED: &str = "delivered";
    pub const CANCELLED: &str = "cancelled";
    pub const COMPLETED: &str = "completed";
}

/// An order that has not been persisted yet. It has no identity; the
/// repository assigns one on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    /// Absent or zero means the price is looked up from the product catalog.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_price: Option<Decimal>,
}

impl NewOrder {
    pub fn new(customer_id: i64, product_id: i64, quantity: i32) -> Self {
        Self {
            customer_id,
            product_id,
            quantity,
            total_price: None,
        }
    }

    pub fn with_total_price(mut self, total_price: Decimal) -> Self {
        self.total_price = Some(total_price);
        self
    }

    /// Price supplied by the caller, if any. Zero counts as "not supplied".
    pub fn supplied_price(&self) -> Option<Decimal> {
        self.total_price.filter(|p| !p.is_zero())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.customer_id <= 0 {
            return Err(format!("customer_id must be positive, got {}", self.customer_id));
        }
        if self.product_id <= 0 {
            return Err(format!("product_id must be positive, got {}", self.product_id));
        }
        if self.quantity <= 0 {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if matches!(self.total_price, Some(p) if p.is_sign_negative()) {
            return Err("total_price must not be negative".to_string());
        }
        Ok(())
    }

    /// Build the order a repository would store for this request, with status
    /// `pending`. Handy for in-memory repositories; SQL-backed ones read the
    /// stored row back instead.
    pub fn into_order(self, id: OrderId, total_price: Decimal, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            quantity: self.quantity,
            total_price,
            status: status::PENDING.to_string(),
            created_at,
        }
    }
}

/// A persisted order. The repository is authoritative for it; the cache
/// holds a time-bounded copy under `order:{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn cache_key(id: OrderId) -> String {
        format!("order:{}", id)
    }
}

/// Full replacement of an order's mutable fields (`PUT /orders/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: String,
}

impl OrderUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_id <= 0 || self.product_id <= 0 {
            return Err("customer_id and product_id must be positive".to_string());
        }
        if self.quantity <= 0 {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if self.total_price.is_sign_negative() {
            return Err("total_price must not be negative".to_string());
        }
        Ok(())
    }

    pub fn apply_to(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            quantity: self.quantity,
            total_price: self.total_price,
            status: self.status,
            created_at,
        }
    }
}
