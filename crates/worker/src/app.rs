//! Startup wiring and graceful shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gunshot_ai::ModelAnalyzer;
use gunshot_events::INBOUND_TOPIC;
use gunshot_infra::Pipeline;
use gunshot_infra::consumer::{
    ConsumerError, ConsumerGroup, ConsumerGroupSettings, ReadyGate,
};
use gunshot_infra::notifier::{KafkaNotifier, ProducerSettings};
use gunshot_infra::predictor::{GrpcInferenceApi, InferenceApi, PredictorClient, RetryPolicy};
use gunshot_observability::TracePropagator;

use crate::config::WorkerConfig;

/// Upper bound for everything that happens after the stop signal, telemetry
/// flush included.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the worker stopped waiting.
#[derive(Debug)]
pub enum Stop {
    Signal(&'static str),
    Consumer(Result<Result<(), ConsumerError>, JoinError>),
}

/// Fully wired worker, consuming in the background.
pub struct App {
    predictor: Arc<PredictorClient<GrpcInferenceApi>>,
    consumer: JoinHandle<Result<(), ConsumerError>>,
    ready: ReadyGate,
    shutdown: CancellationToken,
}

impl App {
    /// Connects every collaborator and starts the consumer group.
    ///
    /// Any error here is startup-fatal.
    pub async fn start(config: &WorkerConfig) -> Result<Self> {
        let propagator = TracePropagator::w3c();

        let api = GrpcInferenceApi::connect(&config.mlservice_host, &config.mlservice_port)
            .await
            .context("can't create connection to ml-service")?;
        let predictor = Arc::new(
            PredictorClient::connect(api, RetryPolicy::default())
                .await
                .context("can't create ml-service client")?,
        );

        let notifier = KafkaNotifier::new(
            &ProducerSettings::new(&config.producer_peers, &config.producer_topic),
            propagator.clone(),
        )
        .context("can't create producer")?;
        info!(topic = notifier.topic(), "producer created");

        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&predictor),
            ModelAnalyzer::default(),
            notifier,
        ));

        if config.consumer_topic != INBOUND_TOPIC {
            warn!(
                configured = %config.consumer_topic,
                topic = INBOUND_TOPIC,
                "CONSUMER_TOPIC differs from the job topic; consuming the job topic"
            );
        }
        let settings = ConsumerGroupSettings::new(
            &config.consumer_peers,
            &config.consumer_group_name,
            INBOUND_TOPIC,
        )
        .with_max_in_flight(config.consumer_max_in_flight);
        let group = ConsumerGroup::new(&settings, pipeline, propagator)
            .context("can't create consumer group")?;

        let ready = group.ready();
        let shutdown = CancellationToken::new();
        let consumer = tokio::spawn(group.run(shutdown.clone()));

        Ok(Self {
            predictor,
            consumer,
            ready,
            shutdown,
        })
    }

    /// Waits for a stop signal or for the consumer to end on its own.
    pub async fn wait(&mut self) -> Stop {
        wait_for_stop(&mut self.consumer, self.ready.wait(), shutdown_signal()).await
    }

    /// Stops consuming and releases the inference connection before
    /// `deadline`.
    pub async fn teardown(self, stop: Stop, deadline: Instant) -> Result<()> {
        stop_within(&self.predictor, self.consumer, &self.shutdown, stop, deadline).await
    }
}

/// Resolves with whichever of `signal` or the consumer task finishes first.
///
/// Logs once when `ready` reports an assignment; readiness never holds up a
/// stop.
async fn wait_for_stop<R, S>(
    consumer: &mut JoinHandle<Result<(), ConsumerError>>,
    ready: R,
    signal: S,
) -> Stop
where
    R: Future<Output = bool>,
    S: Future<Output = &'static str>,
{
    tokio::pin!(ready, signal);
    let mut announced = false;
    loop {
        tokio::select! {
            signal = &mut signal => return Stop::Signal(signal),
            joined = &mut *consumer => return Stop::Consumer(joined),
            ready = &mut ready, if !announced => {
                announced = true;
                if ready {
                    info!("worker running");
                }
            }
        }
    }
}

/// Cancels the consumer, joins it until `deadline`, then releases the
/// predictor.
///
/// A consumer still running at the deadline is aborted and reported as an
/// error. The predictor is shut down either way.
async fn stop_within<A: InferenceApi>(
    predictor: &PredictorClient<A>,
    mut consumer: JoinHandle<Result<(), ConsumerError>>,
    shutdown: &CancellationToken,
    stop: Stop,
    deadline: Instant,
) -> Result<()> {
    shutdown.cancel();

    let joined = match stop {
        Stop::Signal(signal) => {
            info!(signal, "terminating: via signal");
            tokio::time::timeout_at(deadline, &mut consumer).await.ok()
        }
        Stop::Consumer(joined) => Some(joined),
    };

    predictor.shutdown().await;

    match joined {
        Some(Ok(Ok(()))) => Ok(()),
        Some(Ok(Err(err))) => {
            error!(error = %err, "consumer group stopped with error");
            Err(err).context("consumer group")
        }
        Some(Err(join)) => Err(anyhow!(join).context("consumer task panicked")),
        None => {
            consumer.abort();
            warn!(timeout = ?SHUTDOWN_TIMEOUT, "shutdown timed out");
            Err(anyhow!(
                "consumer group did not stop within {SHUTDOWN_TIMEOUT:?}"
            ))
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => {
            warn!(error = %err, "can't install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
