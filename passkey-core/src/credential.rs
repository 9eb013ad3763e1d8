//! Credential records and user accounts
//!
//! A [`Credential`] is created exactly once, when a registration ceremony
//! finishes, and afterwards only its sign counter (and backup state) move.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attestation::AttestationFormat;
use crate::base64url;
use crate::cose::CosePublicKey;
use crate::error::{CeremonyError, Result};

/// Maximum user handle length in bytes
pub const MAX_USER_HANDLE_LEN: usize = 64;

/// Maximum credential ID length in bytes
pub const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// Opaque user handle (1..=64 bytes), never shown to the user.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserHandle(#[serde(with = "base64url")] Vec<u8>);

impl UserHandle {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > MAX_USER_HANDLE_LEN {
            return Err(CeremonyError::InvalidUserHandle(bytes.len()));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for UserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&base64url::encode(&self.0))
    }
}

impl std::fmt::Debug for UserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserHandle({self})")
    }
}

/// Authenticator-chosen credential identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(#[serde(with = "base64url")] pub(crate) Vec<u8>);

impl CredentialId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || bytes.len() > MAX_CREDENTIAL_ID_LEN {
            return Err(CeremonyError::malformed(format!(
                "credential ID length {} out of range",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Parse the base64url form used on the wire.
    pub fn from_base64url(encoded: &str) -> Result<Self> {
        let bytes = base64url::decode(encoded)
            .map_err(|_| CeremonyError::malformed("credential ID is not base64url"))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&base64url::encode(&self.0))
    }
}

impl std::fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialId({self})")
    }
}

/// How the client can reach the authenticator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
}

impl FromStr for AuthenticatorTransport {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "usb" => Ok(Self::Usb),
            "nfc" => Ok(Self::Nfc),
            "ble" => Ok(Self::Ble),
            "smart-card" => Ok(Self::SmartCard),
            // "cable" is the pre-standard name for hybrid
            "hybrid" | "cable" => Ok(Self::Hybrid),
            "internal" => Ok(Self::Internal),
            _ => Err(()),
        }
    }
}

/// A registered authenticator credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub public_key: CosePublicKey,
    /// Signature counter (0 for authenticators without counter support)
    pub sign_count: u32,
    pub transports: Vec<AuthenticatorTransport>,
    pub attestation_format: AttestationFormat,
    #[serde(with = "hex::serde")]
    pub aaguid: [u8; 16],
    /// UV flag observed at registration
    pub user_verified: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether `candidate` is one of the credentials a ceremony allows.
    pub fn matches_allowed_list(candidate: &CredentialId, allowed: &[CredentialId]) -> bool {
        allowed.iter().any(|id| id == candidate)
    }

    /// Check a counter reported by the authenticator against the stored one.
    ///
    /// The reported counter must be strictly greater, except when both are
    /// zero: that authenticator does not implement counters and is accepted
    /// without being treated as a clone signal.
    pub fn verify_counter(&self, reported: u32) -> bool {
        reported > self.sign_count || (reported == 0 && self.sign_count == 0)
    }

    /// AAGUID formatted as a UUID string (8-4-4-4-12).
    pub fn aaguid_string(&self) -> String {
        format_aaguid(&self.aaguid)
    }
}

pub fn format_aaguid(bytes: &[u8; 16]) -> String {
    let h = hex::encode(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    )
}

/// A user account, provisioned outside the engine.
///
/// The engine reads accounts and appends credentials; it never creates or
/// deletes accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub handle: UserHandle,
    pub name: String,
    pub display_name: String,
    pub credentials: Vec<Credential>,
}

impl UserAccount {
    pub fn new(handle: UserHandle, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            display_name: display_name.into(),
            credentials: Vec::new(),
        }
    }

    pub fn credential_ids(&self) -> Vec<CredentialId> {
        self.credentials.iter().map(|c| c.id.clone()).collect()
    }

    pub fn find_credential(&self, id: &CredentialId) -> Option<&Credential> {
        self.credentials.iter().find(|c| &c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(sign_count: u32) -> Credential {
        Credential {
            id: CredentialId::new(vec![1, 2, 3]).unwrap(),
            public_key: CosePublicKey::EdDsa { x: [0u8; 32] },
            sign_count,
            transports: vec![AuthenticatorTransport::Internal],
            attestation_format: AttestationFormat::None,
            aaguid: [0u8; 16],
            user_verified: true,
            backup_eligible: false,
            backup_state: false,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[test]
    fn test_counter_must_increase() {
        let cred = credential(5);
        assert!(cred.verify_counter(6));
        assert!(!cred.verify_counter(5));
        assert!(!cred.verify_counter(4));
        assert!(!cred.verify_counter(0));
    }

    #[test]
    fn test_zero_counter_authenticator_accepted() {
        let cred = credential(0);
        assert!(cred.verify_counter(0));
        assert!(cred.verify_counter(1));
    }

    #[test]
    fn test_matches_allowed_list() {
        let a = CredentialId::new(vec![1]).unwrap();
        let b = CredentialId::new(vec![2]).unwrap();
        assert!(Credential::matches_allowed_list(&a, &[b.clone(), a.clone()]));
        assert!(!Credential::matches_allowed_list(&a, &[b]));
        assert!(!Credential::matches_allowed_list(&a, &[]));
    }

    #[test]
    fn test_user_handle_bounds() {
        assert!(UserHandle::new(b"1234567890".to_vec()).is_ok());
        assert_eq!(
            UserHandle::new(Vec::new()),
            Err(CeremonyError::InvalidUserHandle(0))
        );
        assert_eq!(
            UserHandle::new(vec![0u8; 65]),
            Err(CeremonyError::InvalidUserHandle(65))
        );
    }

    #[test]
    fn test_credential_id_base64url() {
        let id = CredentialId::new(vec![0xfb, 0xff]).unwrap();
        assert_eq!(id.to_string(), "-_8");
        assert_eq!(CredentialId::from_base64url("-_8").unwrap(), id);
        assert!(CredentialId::from_base64url("").is_err());
    }

    #[test]
    fn test_transport_parsing() {
        assert_eq!(
            "cable".parse::<AuthenticatorTransport>(),
            Ok(AuthenticatorTransport::Hybrid)
        );
        assert!("carrier-pigeon".parse::<AuthenticatorTransport>().is_err());
    }

    #[test]
    fn test_format_aaguid() {
        let aaguid = [
            0xcb, 0x69, 0x48, 0x1e, 0x8f, 0xf7, 0x40, 0x39, 0x93, 0xec, 0x0a, 0x27, 0x29, 0xa1,
            0x54, 0xa8,
        ];
        assert_eq!(format_aaguid(&aaguid), "cb69481e-8ff7-4039-93ec-0a2729a154a8");
    }
}
