use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{BreakerConfig, DependencyError, PriceLookup};
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::client::ServiceClient;

pub const SERVICE: &str = "product-service";

#[derive(Debug, Deserialize)]
struct ProductPrice {
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
}

/// Unit price lookup against the product catalog.
pub struct ProductClient {
    client: ServiceClient,
}

impl ProductClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DependencyError> {
        Ok(Self {
            client: ServiceClient::new(SERVICE, base_url, timeout, BreakerConfig::new(SERVICE))?,
        })
    }
}

#[async_trait]
impl PriceLookup for ProductClient {
    async fn unit_price(&self, product_id: i64) -> Result<Decimal, DependencyError> {
        let path = format!("/products/{}", product_id);
        let product = self
            .client
            .call(None, || async {
                let response = self
                    .client
                    .send::<()>(Method::GET, &path, None, StatusCode::OK)
                    .await?;
                self.client.decode::<ProductPrice>(response).await
            })
            .await?;
        Ok(product.price)
    }
}
