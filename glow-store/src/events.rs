use async_trait::async_trait;
use glow_core::{NotifyError, OrderNotifier, User};
use glow_order::Order;
use glow_shared::{OrderPlacedEvent, OrderStatusChangedEvent};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use crate::app_config::KafkaConfig;

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(topic, key, partition = delivery.partition, offset = delivery.offset, "Event published");
                Ok(())
            }
            Err((e, _msg)) => {
                error!(topic, error = %e, "Failed to publish event");
                Err(e)
            }
        }
    }
}

/// Publishes order events for the mailer and back-office consumers.
pub struct KafkaOrderNotifier {
    producer: EventProducer,
    order_topic: String,
    status_topic: String,
}

impl KafkaOrderNotifier {
    pub fn new(config: &KafkaConfig) -> Result<Self, rdkafka::error::KafkaError> {
        Ok(Self {
            producer: EventProducer::new(&config.brokers)?,
            order_topic: config.order_topic.clone(),
            status_topic: config.status_topic.clone(),
        })
    }

    async fn send_json<T: serde::Serialize>(&self, topic: &str, key: &str, event: &T) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event).map_err(|e| NotifyError::Encoding(e.to_string()))?;
        self.producer
            .publish(topic, key, &payload)
            .await
            .map_err(|e| NotifyError::Dispatch(e.to_string()))
    }
}

#[async_trait]
impl OrderNotifier for KafkaOrderNotifier {
    async fn send_order_confirmation(&self, order: &Order, user: &User) -> Result<(), NotifyError> {
        let event = OrderPlacedEvent {
            order_id: order.id,
            user_id: user.id,
            customer_email: user.email.clone(),
            total_cents: order.total_cents,
            shipping_fee_cents: order.shipping_fee_cents,
            item_count: order.item_count(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        self.send_json(&self.order_topic, &order.id.to_string(), &event).await
    }

    async fn send_status_changed(&self, event: &OrderStatusChangedEvent) -> Result<(), NotifyError> {
        self.send_json(&self.status_topic, &event.order_id.to_string(), event).await
    }
}
