//! Errors raised while building domain values from untrusted input.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Client ids are 12-byte object ids rendered as hex.
    #[error("invalid client id {0:?}: expected 24 hex characters")]
    InvalidClientId(String),
}
