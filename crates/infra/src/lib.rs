//! Infrastructure layer: inference client, Kafka consumer group and
//! producer, and the pipeline that ties them together.

pub mod consumer;
pub mod kafka;
pub mod notifier;
pub mod pipeline;
pub mod predictor;

pub use pipeline::{Pipeline, PipelineError, RequestProcessor};
