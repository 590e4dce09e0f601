//! The unit of work threaded through predict → analyze → notify.

use chrono::{DateTime, Utc};

use crate::id::{ClientId, RequestId};

/// Prediction type that selects the gunshot model and its analysis strategy.
pub const GUNSHOT_DETECTION: &str = "gunshot_detection";

/// A single classification job.
///
/// Built fresh per inbound message and dropped once the pipeline returns.
/// `payload` is passed through untouched; `request_id` is never regenerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequest {
    payload: Vec<u8>,
    timestamp: DateTime<Utc>,
    request_id: RequestId,
    client_id: ClientId,
    type_of_prediction: String,
    message_type: String,
}

impl ProcessingRequest {
    pub fn new(
        request_id: RequestId,
        client_id: ClientId,
        payload: Vec<u8>,
        timestamp: DateTime<Utc>,
        type_of_prediction: impl Into<String>,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            payload,
            timestamp,
            request_id,
            client_id,
            type_of_prediction: type_of_prediction.into(),
            message_type: message_type.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn type_of_prediction(&self) -> &str {
        &self.type_of_prediction
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }
}
