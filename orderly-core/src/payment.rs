use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_shared::{Order, OrderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DependencyError;

/// Payment as reported by the payment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(default)]
    pub id: i64,
    pub order_id: OrderId,
    #[serde(default)]
    pub customer_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of creating a payment: the record plus whatever the client needs
/// to complete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHandle {
    pub payment: PaymentRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        order: &Order,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentHandle, DependencyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_parses_service_response() {
        let body = r#"{
            "payment": {
                "id": 12,
                "order_id": 7,
                "customer_id": 3,
                "amount": 49.9,
                "currency": "usd",
                "status": "pending",
                "stripe_payment_id": "pi_123",
                "created_at": "2024-05-01T10:00:00Z"
            },
            "client_secret": "pi_123_secret"
        }"#;

        let handle: PaymentHandle = serde_json::from_str(body).unwrap();
        assert_eq!(handle.payment.order_id, 7);
        assert_eq!(handle.payment.amount, Decimal::new(499, 1));
        assert_eq!(handle.client_secret.as_deref(), Some("pi_123_secret"));
        assert!(handle.message.is_none());
        assert!(handle.payment.updated_at.is_none());
    }
}
