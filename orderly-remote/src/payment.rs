use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{
    BreakerConfig, CircuitState, DependencyError, PaymentGateway, PaymentHandle, TripPolicy,
};
use orderly_shared::{Order, OrderId};
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::client::ServiceClient;

pub const SERVICE: &str = "payment-service";

#[derive(Serialize)]
struct PaymentRequest<'a> {
    order_id: OrderId,
    customer_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    currency: &'a str,
}

/// Breaker settings for the payment service: trips after more than two
/// failures in a row and probes again after 30 seconds.
pub fn payment_breaker() -> BreakerConfig {
    BreakerConfig::new(SERVICE)
        .trip(TripPolicy::ConsecutiveFailures(2))
        .max_half_open_requests(3)
        .open_timeout(Duration::from_secs(30))
}

pub struct PaymentClient {
    client: ServiceClient,
}

impl PaymentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DependencyError> {
        Self::with_breaker(base_url, timeout, payment_breaker())
    }

    pub fn with_breaker(
        base_url: &str,
        timeout: Duration,
        breaker: BreakerConfig,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            client: ServiceClient::new(SERVICE, base_url, timeout, breaker)?,
        })
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.client.breaker().state().await
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    async fn create_payment(
        &self,
        order: &Order,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentHandle, DependencyError> {
        let request = PaymentRequest {
            order_id: order.id,
            customer_id: order.customer_id,
            amount,
            currency,
        };
        tracing::info!(order_id = order.id, %amount, currency, "Creating payment");

        self.client
            .call(None, || async {
                let response = self
                    .client
                    .send(Method::POST, "/payments", Some(&request), StatusCode::CREATED)
                    .await?;
                self.client.decode::<PaymentHandle>(response).await
            })
            .await
    }
}
