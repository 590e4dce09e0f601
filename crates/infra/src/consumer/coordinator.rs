//! Consumer-group membership and the poll loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{CommitMode, Consumer, ConsumerContext, Rebalance, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::{ClientConfig, ClientContext};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use gunshot_observability::TracePropagator;

use super::claim::ClaimProcessor;
use super::error::ConsumerError;
use super::message::InboundMessage;
use super::offsets::{KafkaOffsets, OffsetMarker};
use super::state::{GroupEvent, GroupState, ReadyGate};
use crate::pipeline::RequestProcessor;

/// Default bound on concurrently running message tasks.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

/// Connection and tuning settings for the group consumer.
#[derive(Debug, Clone)]
pub struct ConsumerGroupSettings {
    /// Comma-separated bootstrap brokers.
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub max_in_flight: usize,
    pub session_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl ConsumerGroupSettings {
    pub fn new(
        brokers: impl Into<String>,
        group_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            topic: topic.into(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            session_timeout: Duration::from_secs(20),
            heartbeat_interval: Duration::from_secs(6),
        }
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("partition.assignment.strategy", "roundrobin")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set(
                "session.timeout.ms",
                self.session_timeout.as_millis().to_string(),
            )
            .set(
                "heartbeat.interval.ms",
                self.heartbeat_interval.as_millis().to_string(),
            )
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set_log_level(RDKafkaLogLevel::Warning);
        config
    }
}

/// Forwards rebalance callbacks to the poll loop.
pub struct GroupContext {
    events: mpsc::UnboundedSender<GroupEvent>,
}

impl ClientContext for GroupContext {}

impl ConsumerContext for GroupContext {
    fn pre_rebalance(&self, rebalance: &Rebalance<'_>) {
        if let Rebalance::Revoke(partitions) = rebalance {
            let _ = self.events.send(GroupEvent::Revoked {
                partitions: partitions.count(),
            });
        }
    }

    fn post_rebalance(&self, rebalance: &Rebalance<'_>) {
        let event = match rebalance {
            Rebalance::Assign(partitions) => GroupEvent::Assigned {
                partitions: partitions.count(),
            },
            Rebalance::Revoke(_) => return,
            Rebalance::Error(err) => GroupEvent::RebalanceFailed(err.to_string()),
        };
        let _ = self.events.send(event);
    }
}

/// Where the poll loop gets its records from and how it leaves the group.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    /// Next record, copied out of the client's buffers.
    async fn next(&self) -> Result<InboundMessage, KafkaError>;

    /// Final commit and unsubscribe.
    fn close(&self) -> Result<(), ConsumerError>;
}

#[async_trait]
impl RecordSource for StreamConsumer<GroupContext> {
    async fn next(&self) -> Result<InboundMessage, KafkaError> {
        self.recv()
            .await
            .map(|message| InboundMessage::from_kafka(&message))
    }

    fn close(&self) -> Result<(), ConsumerError> {
        let committed = match self.commit_consumer_state(CommitMode::Sync) {
            Ok(()) | Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => Ok(()),
            Err(err) => Err(ConsumerError::Close(err)),
        };
        self.unsubscribe();
        committed
    }
}

/// One member of the consumer group, driving a [`ClaimProcessor`].
pub struct ConsumerGroup<R: RequestProcessor> {
    consumer: Arc<StreamConsumer<GroupContext>>,
    events: mpsc::UnboundedReceiver<GroupEvent>,
    state: watch::Sender<GroupState>,
    claims: ClaimProcessor<R, KafkaOffsets>,
    topic: String,
}

impl<R: RequestProcessor> ConsumerGroup<R> {
    /// Creates the consumer and subscribes to `settings.topic`.
    pub fn new(
        settings: &ConsumerGroupSettings,
        processor: Arc<R>,
        propagator: TracePropagator,
    ) -> Result<Self, ConsumerError> {
        let (tx, events) = mpsc::unbounded_channel();
        let consumer: StreamConsumer<GroupContext> = settings
            .client_config()
            .create_with_context(GroupContext { events: tx })
            .map_err(ConsumerError::Create)?;
        consumer
            .subscribe(&[settings.topic.as_str()])
            .map_err(|source| ConsumerError::Subscribe {
                topic: settings.topic.clone(),
                source,
            })?;

        let consumer = Arc::new(consumer);
        let offsets = Arc::new(KafkaOffsets::new(Arc::clone(&consumer)));
        let claims = ClaimProcessor::new(processor, offsets, propagator, settings.max_in_flight);
        let (state, _) = watch::channel(GroupState::Joining);

        info!(
            topic = %settings.topic,
            group = %settings.group_id,
            max_in_flight = settings.max_in_flight,
            "consumer group created"
        );

        Ok(Self {
            consumer,
            events,
            state,
            claims,
            topic: settings.topic.clone(),
        })
    }

    /// Readiness handle; take it before handing the group to [`run`].
    ///
    /// [`run`]: ConsumerGroup::run
    pub fn ready(&self) -> ReadyGate {
        ReadyGate::new(self.state.subscribe())
    }

    /// Polls until `shutdown` fires or consumption fails fatally, then closes
    /// the membership.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ConsumerError> {
        info!(topic = %self.topic, "consumer group running");
        poll_loop(
            &*self.consumer,
            self.events,
            &self.state,
            &self.claims,
            &shutdown,
        )
        .await
    }
}

async fn poll_loop<S, R, O>(
    source: &S,
    mut events: mpsc::UnboundedReceiver<GroupEvent>,
    state: &watch::Sender<GroupState>,
    claims: &ClaimProcessor<R, O>,
    shutdown: &CancellationToken,
) -> Result<(), ConsumerError>
where
    S: RecordSource,
    R: RequestProcessor,
    O: OffsetMarker,
{
    let result = loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("shutdown requested, leaving consumer group");
                break Ok(());
            }

            Some(event) = events.recv() => {
                record(state, &event);
            }

            received = source.next() => {
                let message = match received {
                    Ok(message) => message,
                    Err(err) if is_fatal(&err) => {
                        error!(error = %err, "fatal consumer error");
                        break Err(ConsumerError::Consume(err));
                    }
                    Err(err) => {
                        warn!(error = %err, "error from consumer");
                        continue;
                    }
                };
                if !matches!(*state.borrow(), GroupState::Consuming { .. }) {
                    record(state, &GroupEvent::MessageReceived);
                }
                debug!(
                    partition = message.partition,
                    offset = message.offset,
                    "message claimed"
                );
                if claims.dispatch(message, shutdown).await.is_none() {
                    info!("shutdown requested while all workers busy, leaving consumer group");
                    break Ok(());
                }
            }
        }
    };

    let closed = source.close();
    record(state, &GroupEvent::Shutdown);
    result.and(closed)
}

fn record(state: &watch::Sender<GroupState>, event: &GroupEvent) {
    state.send_modify(|s| *s = s.apply(event));
    let generation = state.borrow().generation();
    match event {
        GroupEvent::Assigned { partitions } => {
            info!(partitions, ?generation, "partitions assigned")
        }
        GroupEvent::Revoked { partitions } => {
            info!(partitions, ?generation, "partitions revoked")
        }
        GroupEvent::RebalanceFailed(reason) => warn!(%reason, ?generation, "rebalance failed"),
        GroupEvent::Shutdown => info!("consumer group closed"),
        GroupEvent::MessageReceived => {}
    }
}

fn is_fatal(err: &KafkaError) -> bool {
    err.rdkafka_error_code() == Some(RDKafkaErrorCode::Fatal)
}
