//! Messages and client stub for the TorchServe gRPC inference API
//! (`org.pytorch.serve.grpc.inference.InferenceAPIsService`).
//!
//! Only the two RPCs the worker calls are declared.

use std::collections::HashMap;

use tonic::codegen::http;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictionsRequest {
    /// Name of the model to run.
    #[prost(string, tag = "1")]
    pub model_name: ::prost::alloc::string::String,

    /// Empty selects the default version.
    #[prost(string, tag = "2")]
    pub model_version: ::prost::alloc::string::String,

    #[prost(map = "string, bytes", tag = "3")]
    pub input: HashMap<::prost::alloc::string::String, ::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PredictionResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub prediction: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TorchServeHealthResponse {
    #[prost(string, tag = "1")]
    pub health: ::prost::alloc::string::String,
}

const PING_PATH: &str = "/org.pytorch.serve.grpc.inference.InferenceAPIsService/Ping";
const PREDICTIONS_PATH: &str =
    "/org.pytorch.serve.grpc.inference.InferenceAPIsService/Predictions";

#[derive(Debug, Clone)]
pub struct InferenceApisServiceClient {
    inner: tonic::client::Grpc<tonic::transport::Channel>,
}

impl InferenceApisServiceClient {
    pub fn new(channel: tonic::transport::Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    async fn ready(&mut self) -> Result<(), tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("service was not ready: {e}")))
    }

    pub async fn ping(&mut self) -> Result<tonic::Response<TorchServeHealthResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(PING_PATH);
        self.inner
            .unary(tonic::Request::new(()), path, codec)
            .await
    }

    pub async fn predictions(
        &mut self,
        request: PredictionsRequest,
    ) -> Result<tonic::Response<PredictionResponse>, tonic::Status> {
        self.ready().await?;
        let codec = tonic::codec::ProstCodec::default();
        let path = http::uri::PathAndQuery::from_static(PREDICTIONS_PATH);
        self.inner
            .unary(tonic::Request::new(request), path, codec)
            .await
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn predictions_request_round_trips_through_protobuf() {
        let request = PredictionsRequest {
            model_name: "gunshot_detection".to_string(),
            model_version: String::new(),
            input: HashMap::from([("data".to_string(), vec![1, 2, 3])]),
        };

        let decoded = PredictionsRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn prediction_response_decodes_bytes_field() {
        // field 1, wire type 2 (length-delimited), 5 bytes: "[0.7]"
        let raw = [0x0a, 0x05, b'[', b'0', b'.', b'7', b']'];
        let decoded = PredictionResponse::decode(raw.as_slice()).unwrap();
        assert_eq!(decoded.prediction, b"[0.7]");
    }
}
