//! Ceremony options handed to `navigator.credentials.create()` / `.get()`.
//!
//! Binary members are base64url strings, matching the JSON form browsers
//! accept through `PublicKeyCredential.parseCreationOptionsFromJSON`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::credential::{AuthenticatorTransport, Credential, CredentialId};

pub const PUBLIC_KEY_TYPE: &str = "public-key";

/// User verification policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

impl UserVerificationRequirement {
    /// Only `required` makes the UV flag mandatory during verification.
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

impl FromStr for UserVerificationRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "preferred" => Ok(Self::Preferred),
            "discouraged" => Ok(Self::Discouraged),
            other => Err(format!("unknown user verification requirement: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: CredentialId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<AuthenticatorTransport>,
}

impl From<&Credential> for PublicKeyCredentialDescriptor {
    fn from(credential: &Credential) -> Self {
        Self {
            type_: PUBLIC_KEY_TYPE.to_string(),
            id: credential.id.clone(),
            transports: credential.transports.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    pub resident_key: String,
    pub require_resident_key: bool,
    pub user_verification: UserVerificationRequirement,
}

/// Options for `navigator.credentials.create()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    /// Base64url challenge
    pub challenge: String,
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    /// Milliseconds
    pub timeout: u64,
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelectionCriteria,
    pub attestation: String,
}

/// Options for `navigator.credentials.get()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    /// Base64url challenge
    pub challenge: String,
    /// Milliseconds
    pub timeout: u64,
    pub rp_id: String,
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    pub user_verification: UserVerificationRequirement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_verification_parsing() {
        assert_eq!(
            "Required".parse::<UserVerificationRequirement>(),
            Ok(UserVerificationRequirement::Required)
        );
        assert!("sometimes".parse::<UserVerificationRequirement>().is_err());
        assert!(!UserVerificationRequirement::Preferred.is_required());
    }

    #[test]
    fn test_descriptor_json_shape() {
        let descriptor = PublicKeyCredentialDescriptor {
            type_: PUBLIC_KEY_TYPE.to_string(),
            id: CredentialId::new(vec![1, 2, 3]).unwrap(),
            transports: vec![AuthenticatorTransport::Usb, AuthenticatorTransport::SmartCard],
        };
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["type"], "public-key");
        assert_eq!(json["id"], "AQID");
        assert_eq!(json["transports"][1], "smart-card");
    }
}
