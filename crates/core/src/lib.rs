//! `gunshot-core`: domain building blocks shared by every pipeline stage.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod request;

pub use error::DomainError;
pub use id::{ClientId, RequestId};
pub use request::{GUNSHOT_DETECTION, ProcessingRequest};
