use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{BreakerConfig, CircuitState, DependencyError, InventoryGateway, RetryPolicy};
use orderly_shared::{AvailabilityQuery, AvailabilityResult};
use reqwest::{Method, StatusCode};

use crate::client::ServiceClient;

pub const SERVICE: &str = "inventory-service";

pub struct InventoryClient {
    client: ServiceClient,
    retry: RetryPolicy,
}

impl InventoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DependencyError> {
        Self::with_policies(base_url, timeout, BreakerConfig::new(SERVICE), RetryPolicy::default())
    }

    pub fn with_policies(
        base_url: &str,
        timeout: Duration,
        breaker: BreakerConfig,
        retry: RetryPolicy,
    ) -> Result<Self, DependencyError> {
        Ok(Self {
            client: ServiceClient::new(SERVICE, base_url, timeout, breaker)?,
            retry,
        })
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.client.breaker().state().await
    }
}

#[async_trait]
impl InventoryGateway for InventoryClient {
    async fn check_availability(
        &self,
        product_id: i64,
        quantity: i32,
    ) -> Result<AvailabilityResult, DependencyError> {
        let query = AvailabilityQuery { product_id, quantity };
        tracing::debug!(product_id, quantity, "Checking inventory");

        self.client
            .call(Some(&self.retry), || async {
                let response = self
                    .client
                    .send(Method::POST, "/inventory/check", Some(&query), StatusCode::OK)
                    .await?;
                self.client.decode::<AvailabilityResult>(response).await
            })
            .await
    }
}
