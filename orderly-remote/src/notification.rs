use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{BreakerConfig, DependencyError, NotificationGateway, RetryPolicy};
use orderly_shared::{OrderId, StatusChangeEvent};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::ServiceClient;

pub const SERVICE: &str = "notification-service";

#[derive(Serialize)]
struct OrderNotification<'a> {
    order_id: OrderId,
    #[serde(rename = "type")]
    kind: &'a str,
}

pub struct NotificationClient {
    client: ServiceClient,
    retry: RetryPolicy,
}

impl NotificationClient {
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
}

#[async_trait]
impl NotificationGateway for NotificationClient {
    /// Single attempt through the breaker.
    async fn notify_order_created(&self, order_id: OrderId) -> Result<(), DependencyError> {
        let path = format!("/notify/order/{}", order_id);
        let body = OrderNotification {
            order_id,
            kind: "order_created",
        };

        self.client
            .call(None, || async {
                self.client
                    .send(Method::POST, &path, Some(&body), StatusCode::OK)
                    .await
                    .map(|_| ())
            })
            .await
    }

    async fn notify_status_changed(&self, event: &StatusChangeEvent) -> Result<(), DependencyError> {
        self.client
            .call(Some(&self.retry), || async {
                self.client
                    .send(Method::POST, "/notify/status", Some(event), StatusCode::OK)
                    .await
                    .map(|_| ())
            })
            .await
    }
}
