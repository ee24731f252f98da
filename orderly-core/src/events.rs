use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Where domain events are routed on the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub queue: String,
    pub routing_key: String,
    pub exchange: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            queue: "orders".to_string(),
            routing_key: "order.created".to_string(),
            exchange: "orders".to_string(),
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_bytes(&self, topic: &TopicConfig, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Serialize `payload` as JSON and publish it.
pub async fn publish_json<T: Serialize + ?Sized>(
    publisher: &dyn EventPublisher,
    topic: &TopicConfig,
    payload: &T,
) -> Result<(), PublishError> {
    let bytes = serde_json::to_vec(payload).map_err(|e| PublishError::Serialization(e.to_string()))?;
    publisher.publish_bytes(topic, bytes).await
}
