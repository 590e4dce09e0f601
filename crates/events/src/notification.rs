//! Outbound notification consumed by the notification service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gunshot_core::ProcessingRequest;

use crate::codec::{CodecError, base64_bytes};

/// The only delivery channel the notification service supports today.
pub const TELEGRAM_CHANNEL: &str = "telegram";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "notificationMethods")]
    pub notification_methods: Vec<String>,

    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "requestID")]
    pub request_id: Uuid,

    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(rename = "messageType")]
    pub message_type: String,
}

impl NotificationMessage {
    pub fn from_request(request: &ProcessingRequest) -> Self {
        Self {
            notification_methods: vec![TELEGRAM_CHANNEL.to_string()],
            payload: request.payload().to_vec(),
            timestamp: request.timestamp(),
            request_id: *request.request_id().as_uuid(),
            client_id: request.client_id().to_string(),
            message_type: request.message_type().to_string(),
        }
    }

    /// Partition key: the request id in canonical hyphenated form.
    pub fn key(&self) -> String {
        self.request_id.to_string()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gunshot_core::{ClientId, GUNSHOT_DETECTION, RequestId};
    use proptest::prelude::*;

    fn request(payload: Vec<u8>, nanos: i64) -> ProcessingRequest {
        ProcessingRequest::new(
            RequestId::from_uuid(Uuid::now_v7()),
            ClientId::from_hex("64b7f0c2a1d3e4f5a6b7c8d9").unwrap(),
            payload,
            Utc.timestamp_nanos(nanos),
            GUNSHOT_DETECTION,
            "alert",
        )
    }

    #[test]
    fn wire_field_names_match_notification_service() {
        let msg = NotificationMessage::from_request(&request(vec![1, 2, 3], 0));
        let json: serde_json::Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["notificationMethods"], serde_json::json!(["telegram"]));
        assert_eq!(json["payload"], "AQID");
        assert_eq!(json["clientID"], "64b7f0c2a1d3e4f5a6b7c8d9");
        assert_eq!(json["messageType"], "alert");
        assert_eq!(json["requestID"], msg.request_id.to_string());
        assert_eq!(msg.key(), msg.request_id.to_string());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: decoding an encoded notification yields the request's
        /// id, payload and timestamp unchanged.
        #[test]
        fn notification_preserves_request_fields(
            payload in prop::collection::vec(any::<u8>(), 0..512),
            nanos in 0i64..4_000_000_000_000_000_000i64,
        ) {
            let req = request(payload, nanos);
            let encoded = NotificationMessage::from_request(&req).to_json().unwrap();
            let decoded = NotificationMessage::from_json(&encoded).unwrap();

            prop_assert_eq!(decoded.request_id, *req.request_id().as_uuid());
            prop_assert_eq!(decoded.payload.as_slice(), req.payload());
            prop_assert_eq!(decoded.timestamp, req.timestamp());
        }
    }
}
