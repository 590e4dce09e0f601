use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("can't create consumer group: {0}")]
    Create(#[source] KafkaError),

    #[error("can't subscribe to topic {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("error from consumer: {0}")]
    Consume(#[source] KafkaError),

    #[error("can't mark offset {offset} on {topic}[{partition}]: {source}")]
    Offset {
        topic: String,
        partition: i32,
        offset: i64,
        #[source]
        source: KafkaError,
    },

    #[error("error closing consumer group: {0}")]
    Close(#[source] KafkaError),
}
