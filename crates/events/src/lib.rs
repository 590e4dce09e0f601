//! Broker message schemas (inbound audio jobs, outbound notifications).
//!
//! Both directions are JSON; byte blobs travel as standard base64 strings.

pub mod audio;
pub mod codec;
pub mod notification;

pub use audio::{AudioMessage, AudioPayload, INBOUND_TOPIC};
pub use codec::CodecError;
pub use notification::{NotificationMessage, TELEGRAM_CHANNEL};
