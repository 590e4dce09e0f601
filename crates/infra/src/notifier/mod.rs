//! Outbound notification publishing.

pub mod in_memory;
pub mod kafka;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gunshot_core::ProcessingRequest;
use gunshot_events::CodecError;

pub use in_memory::InMemoryNotifier;
pub use kafka::{KafkaNotifier, ProducerSettings};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("can't encode notification: {0}")]
    Encode(#[from] CodecError),

    #[error("can't send message into kafka: {0}")]
    Publish(#[from] rdkafka::error::KafkaError),
}

/// Publishes one notification for a processed request.
///
/// Implementations do not retry; a failure is returned to the caller as-is.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, request: &ProcessingRequest) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn notify(&self, request: &ProcessingRequest) -> Result<(), NotifyError> {
        (**self).notify(request).await
    }
}
