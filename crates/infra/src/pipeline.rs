//! Predict → analyze → notify for a single request.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{Span, field, info, info_span, instrument};

use gunshot_ai::{AnalyzeError, Analyzer};
use gunshot_core::ProcessingRequest;

use crate::notifier::{Notifier, NotifyError};
use crate::predictor::{PredictError, Predictor};

/// Failure of one pipeline stage; the variant names the stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("predictor.predict: {0}")]
    Predict(#[from] PredictError),

    #[error("analyzer.analyze: {0}")]
    Analyze(#[from] AnalyzeError),

    #[error("notifier.notify: {0}")]
    Notify(#[from] NotifyError),
}

/// Processes a fully-built request. Implemented by [`Pipeline`].
#[async_trait]
pub trait RequestProcessor: Send + Sync + 'static {
    async fn process(&self, request: ProcessingRequest) -> Result<(), PipelineError>;
}

#[async_trait]
impl<R> RequestProcessor for Arc<R>
where
    R: RequestProcessor + ?Sized,
{
    async fn process(&self, request: ProcessingRequest) -> Result<(), PipelineError> {
        (**self).process(request).await
    }
}

/// Sequences the three stages, stopping at the first failure.
///
/// The analyzer verdict is recorded but does not gate the notification:
/// every successfully analyzed request is notified.
#[derive(Debug)]
pub struct Pipeline<P, A, N> {
    predictor: P,
    analyzer: A,
    notifier: N,
}

impl<P, A, N> Pipeline<P, A, N>
where
    P: Predictor,
    A: Analyzer,
    N: Notifier,
{
    pub fn new(predictor: P, analyzer: A, notifier: N) -> Self {
        Self {
            predictor,
            analyzer,
            notifier,
        }
    }
}

#[async_trait]
impl<P, A, N> RequestProcessor for Pipeline<P, A, N>
where
    P: Predictor,
    A: Analyzer,
    N: Notifier,
{
    #[instrument(
        name = "pipeline.process",
        skip_all,
        fields(
            request_id = %request.request_id(),
            client_id = %request.client_id(),
            model_type = %request.type_of_prediction(),
            notify = field::Empty,
        ),
        err
    )]
    async fn process(&self, request: ProcessingRequest) -> Result<(), PipelineError> {
        let result = self
            .predictor
            .predict(request.type_of_prediction(), request.payload())
            .await?;

        let verdict = {
            let _span = info_span!("analyzer.analyze", bytes = result.len()).entered();
            self.analyzer
                .analyze(request.type_of_prediction(), &result)?
        };
        Span::current().record("notify", verdict.notify);
        info!(notify = verdict.notify, score = verdict.score, "analysis complete");

        self.notifier.notify(&request).await?;
        Ok(())
    }
}
