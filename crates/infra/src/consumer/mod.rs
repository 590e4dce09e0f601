//! Consumer-group coordination and per-message dispatch.
//!
//! [`ConsumerGroup`] owns the membership and the poll loop; every received
//! record is handed to a [`ClaimProcessor`] which runs it on its own task.

pub mod claim;
pub mod coordinator;
pub mod error;
pub mod message;
pub mod offsets;
pub mod state;

pub use claim::{ClaimProcessor, MessageOutcome};
pub use coordinator::{
    ConsumerGroup, ConsumerGroupSettings, DEFAULT_MAX_IN_FLIGHT, GroupContext, RecordSource,
};
pub use error::ConsumerError;
pub use message::InboundMessage;
pub use offsets::{KafkaOffsets, OffsetMarker, OffsetWatermarks};
pub use state::{GroupEvent, GroupState, ReadyGate};
