//! Inbound audio job published by the API service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gunshot_core::{ClientId, GUNSHOT_DETECTION, ProcessingRequest, RequestId};

use crate::codec::{CodecError, base64_bytes};

/// Topic the API service writes audio jobs to. Not configurable.
pub const INBOUND_TOPIC: &str = "ApiServiceOutput";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload {
    /// Hex object id of the originating client.
    pub id: String,

    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMessage {
    #[serde(rename = "requestID")]
    pub request_id: Uuid,

    pub payload: AudioPayload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(
        rename = "messageType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_type: Option<String>,
}

impl AudioMessage {
    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Build the pipeline request for this job.
    ///
    /// `received_at` is used when the message carries no timestamp of its own
    /// (the broker timestamp, or the time of receipt).
    pub fn into_request(self, received_at: DateTime<Utc>) -> Result<ProcessingRequest, CodecError> {
        let client_id = ClientId::from_hex(&self.payload.id)?;
        let message_type = self
            .message_type
            .unwrap_or_else(|| GUNSHOT_DETECTION.to_string());

        Ok(ProcessingRequest::new(
            RequestId::from_uuid(self.request_id),
            client_id,
            self.payload.payload,
            self.timestamp.unwrap_or(received_at),
            GUNSHOT_DETECTION,
            message_type,
        ))
    }
}
