//! Per-message dispatch: decoding, offset marking and task isolation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use gunshot_ai::{AnalyzeError, ModelAnalyzer};
use gunshot_core::ProcessingRequest;
use gunshot_events::{AudioMessage, AudioPayload, INBOUND_TOPIC};
use gunshot_infra::consumer::{
    ClaimProcessor, ConsumerError, InboundMessage, MessageOutcome, OffsetMarker,
};
use gunshot_infra::notifier::InMemoryNotifier;
use gunshot_infra::predictor::{PredictError, Predictor};
use gunshot_infra::{Pipeline, PipelineError, RequestProcessor};
use gunshot_observability::TracePropagator;

const CLIENT: &str = "65A1B2C3D4E5F60718293A4B";

#[derive(Default)]
struct RecordingOffsets {
    marked: Mutex<Vec<(i32, i64)>>,
}

impl RecordingOffsets {
    fn marked(&self) -> Vec<(i32, i64)> {
        self.marked.lock().unwrap().clone()
    }
}

impl OffsetMarker for RecordingOffsets {
    fn mark_processed(&self, message: &InboundMessage) -> Result<(), ConsumerError> {
        self.marked
            .lock()
            .unwrap()
            .push((message.partition, message.offset));
        Ok(())
    }
}

/// Records every request it is handed; fails requests whose payload starts
/// with `0xFF`, after waiting for `release`.
#[derive(Default)]
struct GatedProcessor {
    seen: Mutex<Vec<ProcessingRequest>>,
    release: Notify,
}

#[async_trait]
impl RequestProcessor for GatedProcessor {
    async fn process(&self, request: ProcessingRequest) -> Result<(), PipelineError> {
        self.seen.lock().unwrap().push(request.clone());
        if request.payload().first() == Some(&0xFF) {
            self.release.notified().await;
            return Err(AnalyzeError::UnknownModelType("poisoned".into()).into());
        }
        Ok(())
    }
}

struct EchoPredictor;

#[async_trait]
impl Predictor for EchoPredictor {
    async fn predict(&self, _model_type: &str, _data: &[u8]) -> Result<Vec<u8>, PredictError> {
        Ok(b"[0.77]".to_vec())
    }
}

fn inbound(offset: i64, payload: Vec<u8>) -> InboundMessage {
    InboundMessage {
        topic: INBOUND_TOPIC.to_string(),
        partition: 0,
        offset,
        timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        headers: HashMap::new(),
        payload,
    }
}

fn audio_job(request_id: Uuid, audio: &[u8]) -> Vec<u8> {
    serde_json::to_vec(&AudioMessage {
        request_id,
        payload: AudioPayload {
            id: CLIENT.to_string(),
            payload: audio.to_vec(),
        },
        timestamp: None,
        message_type: None,
    })
    .unwrap()
}

fn running() -> CancellationToken {
    CancellationToken::new()
}

fn claims<R: RequestProcessor>(
    processor: Arc<R>,
    offsets: Arc<RecordingOffsets>,
) -> ClaimProcessor<R, RecordingOffsets> {
    ClaimProcessor::new(processor, offsets, TracePropagator::w3c(), 8)
}

#[tokio::test]
async fn decoded_job_reaches_notifier_unchanged() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let pipeline = Arc::new(Pipeline::new(
        EchoPredictor,
        ModelAnalyzer::default(),
        notifier.clone(),
    ));
    let offsets = Arc::new(RecordingOffsets::default());
    let claims = claims(pipeline, offsets.clone());
    let request_id = Uuid::now_v7();

    let outcome = claims
        .dispatch(inbound(7, audio_job(request_id, &[1, 2, 3])), &running())
        .await
        .unwrap()
        .await
        .unwrap();

    assert_eq!(outcome, MessageOutcome::Processed);
    let sent = notifier.all();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].request_id, request_id);
    assert_eq!(sent[0].client_id, CLIENT.to_lowercase());
    assert_eq!(sent[0].payload, vec![1, 2, 3]);
    assert_eq!(sent[0].message_type, "gunshot_detection");
    assert_eq!(
        sent[0].timestamp,
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    );
    assert_eq!(offsets.marked(), vec![(0, 7)]);
}

#[tokio::test]
async fn malformed_body_skips_processor_but_marks_offset() {
    let processor = Arc::new(GatedProcessor::default());
    let offsets = Arc::new(RecordingOffsets::default());
    let claims = claims(processor.clone(), offsets.clone());

    let bodies = [
        b"not json".to_vec(),
        Vec::new(),
        br#"{"requestID":"5f0c2a4e-3b1d-4c55-9e11-2b7f6c0d9a10","payload":{"id":"xyz","payload":"AQID"}}"#.to_vec(),
    ];
    for (offset, body) in (10..).zip(bodies) {
        let outcome = claims.handle(inbound(offset, body)).await;
        assert_eq!(outcome, MessageOutcome::Malformed);
    }

    assert!(processor.seen.lock().unwrap().is_empty());
    assert_eq!(offsets.marked(), vec![(0, 10), (0, 11), (0, 12)]);
}

#[tokio::test]
async fn message_type_tag_is_carried_into_notification() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let pipeline = Arc::new(Pipeline::new(
        EchoPredictor,
        ModelAnalyzer::default(),
        notifier.clone(),
    ));
    let offsets = Arc::new(RecordingOffsets::default());
    let claims = claims(pipeline, offsets.clone());

    let mut body: serde_json::Value =
        serde_json::from_slice(&audio_job(Uuid::now_v7(), &[9])).unwrap();
    body["messageType"] = "custom_tag".into();
    let outcome = claims
        .handle(inbound(3, serde_json::to_vec(&body).unwrap()))
        .await;

    assert_eq!(outcome, MessageOutcome::Processed);
    assert_eq!(notifier.all()[0].message_type, "custom_tag");
    assert_eq!(offsets.marked(), vec![(0, 3)]);
}

#[tokio::test]
async fn back_to_back_messages_run_independently() {
    let processor = Arc::new(GatedProcessor::default());
    let offsets = Arc::new(RecordingOffsets::default());
    let claims = claims(processor.clone(), offsets.clone());

    let stuck = claims
        .dispatch(inbound(1, audio_job(Uuid::now_v7(), &[0xFF, 0x00])), &running())
        .await
        .unwrap();
    let healthy = claims
        .dispatch(inbound(2, audio_job(Uuid::now_v7(), &[0x01])), &running())
        .await
        .unwrap();

    let healthy = tokio::time::timeout(Duration::from_secs(1), healthy)
        .await
        .expect("healthy message blocked by its sibling")
        .unwrap();
    assert_eq!(healthy, MessageOutcome::Processed);
    assert!(!stuck.is_finished());
    assert_eq!(offsets.marked(), vec![(0, 2)]);

    processor.release.notify_one();
    assert_eq!(stuck.await.unwrap(), MessageOutcome::Failed);
    assert_eq!(offsets.marked(), vec![(0, 2), (0, 1)]);
    assert_eq!(processor.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn in_flight_tasks_are_bounded() {
    let processor = Arc::new(GatedProcessor::default());
    let offsets = Arc::new(RecordingOffsets::default());
    let claims = ClaimProcessor::new(processor.clone(), offsets, TracePropagator::w3c(), 1);

    let first = claims
        .dispatch(inbound(1, audio_job(Uuid::now_v7(), &[0xFF])), &running())
        .await
        .unwrap();
    assert_eq!(claims.available(), 0);

    let second = tokio::spawn({
        let claims = claims.clone();
        async move {
            claims
                .dispatch(inbound(2, audio_job(Uuid::now_v7(), &[0x02])), &running())
                .await
                .unwrap()
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!second.is_finished());

    processor.release.notify_one();
    assert_eq!(first.await.unwrap(), MessageOutcome::Failed);
    let second = second.await.unwrap();
    assert_eq!(second.await.unwrap(), MessageOutcome::Processed);
    assert_eq!(claims.available(), 1);
}
