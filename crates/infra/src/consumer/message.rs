use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rdkafka::Message;

use crate::kafka::header_map;

/// An owned copy of one consumed record.
///
/// Detached from the consumer so it can move into a per-message task while
/// the poll loop keeps receiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn from_kafka<M: Message>(message: &M) -> Self {
        Self {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp: message
                .timestamp()
                .to_millis()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            headers: header_map(message.headers()),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::{Header, OwnedHeaders, OwnedMessage, Timestamp};

    #[test]
    fn copies_record_fields_and_headers() {
        let headers = OwnedHeaders::new().insert(Header {
            key: "traceparent",
            value: Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"),
        });
        let record = OwnedMessage::new(
            Some(b"{}".to_vec()),
            Some(b"key".to_vec()),
            "ApiServiceOutput".to_string(),
            Timestamp::CreateTime(1_700_000_000_000),
            3,
            42,
            Some(headers),
        );

        let msg = InboundMessage::from_kafka(&record);

        assert_eq!(msg.topic, "ApiServiceOutput");
        assert_eq!(msg.partition, 3);
        assert_eq!(msg.offset, 42);
        assert_eq!(msg.payload, b"{}".to_vec());
        assert_eq!(
            msg.timestamp,
            DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000)
        );
        assert!(msg.headers.contains_key("traceparent"));
    }

    #[test]
    fn missing_payload_and_timestamp_are_tolerated() {
        let record = OwnedMessage::new(
            None,
            None,
            "ApiServiceOutput".to_string(),
            Timestamp::NotAvailable,
            0,
            0,
            None,
        );

        let msg = InboundMessage::from_kafka(&record);

        assert!(msg.payload.is_empty());
        assert!(msg.timestamp.is_none());
        assert!(msg.headers.is_empty());
    }
}
