//! Client responses as produced by `PublicKeyCredential.toJSON()`.

use serde::{Deserialize, Serialize};

use crate::base64url;
use crate::credential::{AuthenticatorTransport, CredentialId};
use crate::error::{CeremonyError, Result};
use crate::protocol::options::PUBLIC_KEY_TYPE;

/// Response to `navigator.credentials.create()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "base64url")]
    pub attestation_object: Vec<u8>,
    /// Raw transport hints; unknown values are dropped, not rejected
    #[serde(default)]
    pub transports: Vec<String>,
}

/// Response to `navigator.credentials.get()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "base64url")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "base64url")]
    pub signature: Vec<u8>,
    #[serde(default, with = "base64url::option")]
    pub user_handle: Option<Vec<u8>>,
}

/// `id` and `rawId` must name the same credential and `type` must be `public-key`.
fn credential_id(type_: &str, id: &str, raw_id: &[u8]) -> Result<CredentialId> {
    if type_ != PUBLIC_KEY_TYPE {
        return Err(CeremonyError::malformed(format!(
            "credential type {type_:?} is not public-key"
        )));
    }
    let from_id = CredentialId::from_base64url(id)?;
    if from_id.as_bytes() != raw_id {
        return Err(CeremonyError::malformed("id and rawId differ"));
    }
    Ok(from_id)
}

impl RegistrationResponse {
    pub fn credential_id(&self) -> Result<CredentialId> {
        credential_id(&self.type_, &self.id, &self.raw_id)
    }

    pub fn transports(&self) -> Vec<AuthenticatorTransport> {
        let mut transports: Vec<AuthenticatorTransport> = self
            .response
            .transports
            .iter()
            .filter_map(|t| t.parse().ok())
            .collect();
        transports.dedup();
        transports
    }
}

impl AuthenticationResponse {
    pub fn credential_id(&self) -> Result<CredentialId> {
        credential_id(&self.type_, &self.id, &self.raw_id)
    }
}
