//! Per-message fan-out.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, error, field, info_span, warn};

use gunshot_core::ProcessingRequest;
use gunshot_events::{AudioMessage, CodecError};
use gunshot_observability::TracePropagator;

use super::message::InboundMessage;
use super::offsets::OffsetMarker;
use crate::pipeline::RequestProcessor;

/// What happened to one inbound message. The offset is marked in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Processed,
    Failed,
    Malformed,
}

/// Turns each consumed message into an independent task that decodes the
/// request, runs it through the processor and marks the offset.
///
/// Concurrency is bounded by `max_in_flight` permits; [`dispatch`] waits for
/// a free permit, or for shutdown, before spawning.
///
/// [`dispatch`]: ClaimProcessor::dispatch
pub struct ClaimProcessor<R, O> {
    processor: Arc<R>,
    offsets: Arc<O>,
    propagator: TracePropagator,
    permits: Arc<Semaphore>,
}

impl<R, O> Clone for ClaimProcessor<R, O> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            offsets: Arc::clone(&self.offsets),
            propagator: self.propagator.clone(),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<R, O> ClaimProcessor<R, O>
where
    R: RequestProcessor,
    O: OffsetMarker,
{
    pub fn new(
        processor: Arc<R>,
        offsets: Arc<O>,
        propagator: TracePropagator,
        max_in_flight: usize,
    ) -> Self {
        Self {
            processor,
            offsets,
            propagator,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Permits not currently held by a running task.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Spawns the task for `message` once a permit is free.
    ///
    /// Returns `None`, leaving the message unprocessed and unmarked, if
    /// `shutdown` fires while every permit is held.
    pub async fn dispatch(
        &self,
        message: InboundMessage,
        shutdown: &CancellationToken,
    ) -> Option<JoinHandle<MessageOutcome>> {
        let permit = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        };
        let this = self.clone();
        Some(tokio::spawn(async move {
            let _permit = permit;
            this.handle(message).await
        }))
    }

    /// Processes one message inline and marks its offset exactly once.
    pub async fn handle(&self, message: InboundMessage) -> MessageOutcome {
        let span = info_span!(
            "process_message",
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            request_id = field::Empty,
        );
        self.propagator.set_parent(&span, &message.headers);

        let outcome = self.run(&message).instrument(span.clone()).await;

        if let Err(err) = self.offsets.mark_processed(&message) {
            span.in_scope(|| error!(error = %err, "can't mark message"));
        }
        outcome
    }

    async fn run(&self, message: &InboundMessage) -> MessageOutcome {
        let request = match decode(message) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "can't deserialize message");
                return MessageOutcome::Malformed;
            }
        };
        Span::current().record("request_id", field::display(request.request_id()));

        match self.processor.process(request).await {
            Ok(()) => MessageOutcome::Processed,
            Err(err) => {
                error!(error = %err, "can't process request");
                MessageOutcome::Failed
            }
        }
    }
}

fn decode(message: &InboundMessage) -> Result<ProcessingRequest, CodecError> {
    let received_at = message.timestamp.unwrap_or_else(Utc::now);
    AudioMessage::from_json(&message.payload)?.into_request(received_at)
}
