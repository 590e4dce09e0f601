//! Remote inference client.
//!
//! [`Predictor`] is the capability the pipeline depends on; [`PredictorClient`]
//! implements it over any [`InferenceApi`] (gRPC in production, fakes in tests)
//! and masks transient failures with a fixed-delay retry.

pub mod client;
pub mod proto;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{GrpcInferenceApi, InferenceApi, PredictorClient};
pub use retry::{Exhausted, RetryPolicy};

/// Input key the inference service expects the audio bytes under.
pub const INPUT_KEY: &str = "data";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("can't create connection to ml-service: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("ml-service health check failed: {0}")]
    Unavailable(tonic::Status),

    #[error("error during make prediction after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: tonic::Status },

    #[error("ml-service client is shut down")]
    Closed,
}

impl From<Exhausted<tonic::Status>> for PredictError {
    fn from(value: Exhausted<tonic::Status>) -> Self {
        Self::Exhausted {
            attempts: value.attempts,
            last: value.last,
        }
    }
}

/// Obtains a raw inference result for a payload.
#[async_trait]
pub trait Predictor: Send + Sync + 'static {
    async fn predict(&self, model_type: &str, data: &[u8]) -> Result<Vec<u8>, PredictError>;
}

#[async_trait]
impl<P> Predictor for Arc<P>
where
    P: Predictor + ?Sized,
{
    async fn predict(&self, model_type: &str, data: &[u8]) -> Result<Vec<u8>, PredictError> {
        (**self).predict(model_type, data).await
    }
}
