use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::proto::{InferenceApisServiceClient, PredictionResponse, PredictionsRequest};
use super::retry::RetryPolicy;
use super::{INPUT_KEY, PredictError, Predictor};

/// One round-trip to the inference service, without retry.
#[async_trait]
pub trait InferenceApi: Send + Sync + 'static {
    /// Health check; returns the service's health string.
    async fn ping(&self) -> Result<String, tonic::Status>;

    async fn predictions(&self, request: PredictionsRequest)
    -> Result<PredictionResponse, tonic::Status>;
}

#[async_trait]
impl<A> InferenceApi for Arc<A>
where
    A: InferenceApi + ?Sized,
{
    async fn ping(&self) -> Result<String, tonic::Status> {
        (**self).ping().await
    }

    async fn predictions(
        &self,
        request: PredictionsRequest,
    ) -> Result<PredictionResponse, tonic::Status> {
        (**self).predictions(request).await
    }
}

/// [`InferenceApi`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcInferenceApi {
    client: InferenceApisServiceClient,
}

impl GrpcInferenceApi {
    /// Open a plaintext HTTP/2 channel to `host:port`.
    pub async fn connect(host: &str, port: &str) -> Result<Self, PredictError> {
        let channel = tonic::transport::Endpoint::from_shared(format!("http://{host}:{port}"))?
            .connect_timeout(Duration::from_secs(5))
            .connect()
            .await?;

        Ok(Self {
            client: InferenceApisServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl InferenceApi for GrpcInferenceApi {
    async fn ping(&self) -> Result<String, tonic::Status> {
        // tonic clients are cheap handles over the shared channel.
        let mut client = self.client.clone();
        Ok(client.ping().await?.into_inner().health)
    }

    async fn predictions(
        &self,
        request: PredictionsRequest,
    ) -> Result<PredictionResponse, tonic::Status> {
        let mut client = self.client.clone();
        Ok(client.predictions(request).await?.into_inner())
    }
}

/// Predictor that retries every failed inference call per [`RetryPolicy`].
///
/// Shared by all in-flight messages. [`PredictorClient::shutdown`] drops the
/// underlying connection; later predictions fail with [`PredictError::Closed`].
pub struct PredictorClient<A> {
    api: RwLock<Option<Arc<A>>>,
    policy: RetryPolicy,
}

impl<A> core::fmt::Debug for PredictorClient<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PredictorClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<A> PredictorClient<A>
where
    A: InferenceApi,
{
    /// Wrap `api` after a successful health check.
    ///
    /// A failed ping is returned as [`PredictError::Unavailable`] and is meant
    /// to abort startup.
    pub async fn connect(api: A, policy: RetryPolicy) -> Result<Self, PredictError> {
        let health = api.ping().await.map_err(PredictError::Unavailable)?;
        info!(health = %health, "ml-service client created");

        Ok(Self {
            api: RwLock::new(Some(Arc::new(api))),
            policy,
        })
    }

    /// Release the connection.
    pub async fn shutdown(&self) {
        self.api.write().await.take();
    }
}

#[async_trait]
impl<A> Predictor for PredictorClient<A>
where
    A: InferenceApi,
{
    #[instrument(
        name = "predictor.predict",
        skip_all,
        fields(model_type = %model_type, bytes = data.len()),
        err
    )]
    async fn predict(&self, model_type: &str, data: &[u8]) -> Result<Vec<u8>, PredictError> {
        let api = self.api.read().await.clone().ok_or(PredictError::Closed)?;

        let request = PredictionsRequest {
            model_name: model_type.to_string(),
            model_version: String::new(),
            input: HashMap::from([(INPUT_KEY.to_string(), data.to_vec())]),
        };

        let response = self
            .policy
            .run(
                |_| {
                    let api = api.clone();
                    let request = request.clone();
                    async move { api.predictions(request).await }
                },
                |attempt, status| {
                    warn!(attempt, code = ?status.code(), error = %status, "prediction error, use retry");
                },
            )
            .await?;

        Ok(response.prediction)
    }
}
