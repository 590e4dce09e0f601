use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;

use super::coordinator::GroupContext;
use super::error::ConsumerError;
use super::message::InboundMessage;

/// Acknowledges that a consumed message needs no further delivery.
pub trait OffsetMarker: Send + Sync + 'static {
    fn mark_processed(&self, message: &InboundMessage) -> Result<(), ConsumerError>;
}

/// Highest next-offset stored per topic partition.
///
/// Tasks finish out of order; a late, lower offset must never move the
/// stored position backwards.
#[derive(Debug, Default)]
pub struct OffsetWatermarks {
    next: Mutex<HashMap<(String, i32), i64>>,
}

impl OffsetWatermarks {
    /// Calls `store` with `next` if it is ahead of the current watermark.
    ///
    /// The lock is held across `store`, so concurrent marks reach it in
    /// increasing order. Returns whether anything was stored.
    pub fn advance<F>(&self, topic: &str, partition: i32, next: i64, store: F) -> KafkaResult<bool>
    where
        F: FnOnce(i64) -> KafkaResult<()>,
    {
        let mut marks = self
            .next
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (topic.to_string(), partition);
        if marks.get(&key).is_some_and(|&current| current >= next) {
            return Ok(false);
        }
        store(next)?;
        marks.insert(key, next);
        Ok(true)
    }
}

/// Stores the next offset on the group consumer; the periodic auto-commit
/// flushes it to the broker.
#[derive(Clone)]
pub struct KafkaOffsets {
    consumer: Arc<StreamConsumer<GroupContext>>,
    watermarks: Arc<OffsetWatermarks>,
}

impl KafkaOffsets {
    pub(crate) fn new(consumer: Arc<StreamConsumer<GroupContext>>) -> Self {
        Self {
            consumer,
            watermarks: Arc::new(OffsetWatermarks::default()),
        }
    }
}

impl OffsetMarker for KafkaOffsets {
    fn mark_processed(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        self.watermarks
            .advance(&message.topic, message.partition, message.offset + 1, |next| {
                self.consumer
                    .store_offset(&message.topic, message.partition, next)
            })
            .map(drop)
            .map_err(|source| ConsumerError::Offset {
                topic: message.topic.clone(),
                partition: message.partition,
                offset: message.offset,
                source,
            })
    }
}
