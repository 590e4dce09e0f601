//! Strongly-typed identifiers carried by a processing request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Correlation id assigned by the upstream producer.
///
/// Never regenerated inside the worker: the same value is read from the
/// inbound message and used as the key of the outbound notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for RequestId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<RequestId> for Uuid {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

/// Identifier of the client that originated a request.
///
/// Upstream embeds a 12-byte object id rendered as 24 hex characters; it is
/// normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    const HEX_LEN: usize = 24;

    /// Parse a hex object id.
    pub fn from_hex(hex: &str) -> Result<Self, DomainError> {
        if hex.len() != Self::HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidClientId(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
