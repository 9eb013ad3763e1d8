//! `clientDataJSON` (W3C WebAuthn §5.8.1).
//!
//! ```json
//! { "type": "webauthn.create", "challenge": "<base64url>", "origin": "https://example.com" }
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::base64url;
use crate::error::{CeremonyError, Result};

pub const TYPE_CREATE: &str = "webauthn.create";
pub const TYPE_GET: &str = "webauthn.get";

/// Fields collected by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedClientData {
    #[serde(rename = "type")]
    pub ceremony_type: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_origin: Option<String>,
}

/// Parsed client data with the hash the authenticator signed over
#[derive(Debug, Clone)]
pub struct ClientData {
    pub collected: CollectedClientData,
    pub hash: [u8; 32],
}

impl ClientData {
    /// Parse raw `clientDataJSON` bytes and hash them.
    ///
    /// The hash is taken over the exact bytes received, never a re-serialization.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let collected: CollectedClientData = serde_json::from_slice(raw)
            .map_err(|e| CeremonyError::malformed(format!("clientDataJSON is not valid: {e}")))?;
        Ok(Self {
            collected,
            hash: Sha256::digest(raw).into(),
        })
    }

    /// Decoded challenge bytes.
    pub fn challenge(&self) -> Result<Vec<u8>> {
        base64url::decode(&self.collected.challenge)
            .map_err(|_| CeremonyError::malformed("client data challenge is not base64url"))
    }
}

impl CollectedClientData {
    pub fn new(ceremony_type: &str, challenge: &[u8], origin: &str) -> Self {
        Self {
            ceremony_type: ceremony_type.to_string(),
            challenge: base64url::encode(challenge),
            origin: origin.to_string(),
            cross_origin: Some(false),
            top_origin: None,
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Serializing plain strings and bools cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
