//! JSON codec helpers shared by inbound and outbound schemas.

use thiserror::Error;

use gunshot_core::DomainError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("empty message body")]
    Empty,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Serde adapter for `Vec<u8>` fields encoded as standard base64 strings.
pub mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Upstream encodes an empty slice as `null`.
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            Some(s) => BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
