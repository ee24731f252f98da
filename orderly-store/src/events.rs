use std::time::Duration;

use async_trait::async_trait;
use orderly_core::{EventPublisher, PublishError, TopicConfig};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{error, info};

/// Publishes to the Kafka topic named by the exchange, keyed by routing key.
#[derive(Clone)]
pub struct KafkaEventPublisher {
    producer: FutureProducer,
}

impl KafkaEventPublisher {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish_bytes(&self, topic: &TopicConfig, payload: Vec<u8>) -> Result<(), PublishError> {
        let record = FutureRecord::to(&topic.exchange)
            .key(&topic.routing_key)
            .payload(&payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic.exchange, topic.routing_key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic.exchange, e);
                Err(PublishError::Broker {
                    topic: topic.exchange.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}
