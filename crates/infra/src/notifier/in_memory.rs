use std::sync::Mutex;

use async_trait::async_trait;

use gunshot_core::ProcessingRequest;
use gunshot_events::NotificationMessage;

use super::{Notifier, NotifyError};

/// In-memory notifier for tests/dev: keeps every notification it was asked to send.
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<NotificationMessage>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<NotificationMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, request: &ProcessingRequest) -> Result<(), NotifyError> {
        let message = NotificationMessage::from_request(request);
        // Encode as the broker notifier would so codec failures surface here too.
        message.to_json()?;
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }
}
