use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rdkafka::ClientConfig;
use rdkafka::error::KafkaResult;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tracing::{info, instrument};

use gunshot_core::ProcessingRequest;
use gunshot_events::NotificationMessage;
use gunshot_observability::TracePropagator;

use super::{Notifier, NotifyError};
use crate::kafka::current_trace_headers;

/// Connection settings for the notification producer.
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    /// Comma-separated bootstrap brokers.
    pub brokers: String,
    /// Topic notifications are written to.
    pub topic: String,
    /// Upper bound for queueing plus delivery of one message.
    pub message_timeout: Duration,
}

impl ProducerSettings {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            message_timeout: Duration::from_secs(5),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("acks", "all")
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            );
        config
    }
}

/// Publishes notifications to Kafka, keyed by request id.
pub struct KafkaNotifier {
    producer: FutureProducer,
    topic: String,
    queue_timeout: Duration,
    propagator: TracePropagator,
}

impl KafkaNotifier {
    pub fn new(settings: &ProducerSettings, propagator: TracePropagator) -> KafkaResult<Self> {
        let producer: FutureProducer = settings.client_config().create()?;

        Ok(Self {
            producer,
            topic: settings.topic.clone(),
            queue_timeout: settings.message_timeout,
            propagator,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    #[instrument(
        name = "notifier.notify",
        skip_all,
        fields(topic = %self.topic, request_id = %request.request_id()),
        err
    )]
    async fn notify(&self, request: &ProcessingRequest) -> Result<(), NotifyError> {
        let message = NotificationMessage::from_request(request);
        let payload = message.to_json()?;
        let key = message.key();

        let record = FutureRecord::to(&self.topic)
            .key(key.as_str())
            .payload(payload.as_slice())
            .headers(current_trace_headers(&self.propagator))
            .timestamp(Utc::now().timestamp_millis());

        let (partition, offset) = self
            .producer
            .send(record, self.queue_timeout)
            .await
            .map_err(|(err, _message)| NotifyError::Publish(err))?;

        info!(partition, offset, "message successfully send to broker");
        Ok(())
    }
}

impl core::fmt::Debug for KafkaNotifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KafkaNotifier")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_waits_for_all_replicas() {
        let settings = ProducerSettings::new("kafka-1:9092,kafka-2:9092", "GunshotNotificationInput");
        let config = settings.client_config();

        assert_eq!(config.get("bootstrap.servers"), Some("kafka-1:9092,kafka-2:9092"));
        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("message.timeout.ms"), Some("5000"));
    }
}
