//! Authenticator data parsing (W3C WebAuthn §6.1).
//!
//! Layout:
//! ```text
//! rpIdHash[32] | flags[1] | signCount[4] | [attestedCredentialData] | [extensions]
//! attestedCredentialData = aaguid[16] | credIdLen[2] | credId | credentialPublicKey (COSE, CBOR)
//! ```

use ciborium::Value;

use crate::cose::CosePublicKey;
use crate::credential::CredentialId;
use crate::error::{CeremonyError, Result};

/// Minimum authenticator data length: rpIdHash + flags + signCount
pub const MIN_AUTH_DATA_LEN: usize = 37;

/// Authenticator data flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKUP_STATE: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn user_present(self) -> bool {
        self.has(Self::USER_PRESENT)
    }

    pub fn user_verified(self) -> bool {
        self.has(Self::USER_VERIFIED)
    }

    pub fn backup_eligible(self) -> bool {
        self.has(Self::BACKUP_ELIGIBLE)
    }

    pub fn backup_state(self) -> bool {
        self.has(Self::BACKUP_STATE)
    }

    pub fn attested_credential_data(self) -> bool {
        self.has(Self::ATTESTED_CREDENTIAL_DATA)
    }

    pub fn extension_data(self) -> bool {
        self.has(Self::EXTENSION_DATA)
    }
}

/// Credential data attached to authenticator data during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: CredentialId,
    pub public_key: CosePublicKey,
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
    pub extensions: Option<Value>,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_AUTH_DATA_LEN {
            return Err(CeremonyError::malformed(format!(
                "authenticator data too short: {} bytes (minimum {MIN_AUTH_DATA_LEN})",
                bytes.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = AuthenticatorFlags::from_bits(bytes[32]);
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        if flags.backup_state() && !flags.backup_eligible() {
            return Err(CeremonyError::malformed(
                "backup state set on a credential that is not backup eligible",
            ));
        }

        let mut rest = &bytes[MIN_AUTH_DATA_LEN..];

        let attested_credential = if flags.attested_credential_data() {
            Some(parse_attested_credential(&mut rest)?)
        } else {
            None
        };

        let extensions = if flags.extension_data() {
            let value: Value = ciborium::from_reader(&mut rest).map_err(|e| {
                CeremonyError::malformed(format!("invalid extension data CBOR: {e}"))
            })?;
            Some(value)
        } else {
            None
        };

        if !rest.is_empty() {
            return Err(CeremonyError::malformed(format!(
                "{} trailing bytes after authenticator data",
                rest.len()
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
            extensions,
        })
    }

    /// Serialize back to the wire layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(MIN_AUTH_DATA_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags.bits());
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(attested) = &self.attested_credential {
            let id = attested.credential_id.as_bytes();
            out.extend_from_slice(&attested.aaguid);
            // Credential IDs are capped at 1023 bytes, so the length fits in u16.
            out.extend_from_slice(&(id.len() as u16).to_be_bytes());
            out.extend_from_slice(id);
            out.extend_from_slice(&attested.public_key.to_cbor_bytes()?);
        }
        if let Some(ext) = &self.extensions {
            ciborium::into_writer(ext, &mut out)
                .map_err(|e| CeremonyError::malformed(format!("extensions encode: {e}")))?;
        }
        Ok(out)
    }
}

fn parse_attested_credential(rest: &mut &[u8]) -> Result<AttestedCredentialData> {
    if rest.len() < 18 {
        return Err(CeremonyError::malformed(
            "attested credential data flag set but data too short",
        ));
    }
    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&rest[..16]);
    let id_len = u16::from_be_bytes([rest[16], rest[17]]) as usize;
    *rest = &rest[18..];

    if rest.len() < id_len {
        return Err(CeremonyError::malformed(format!(
            "credential ID length {id_len} exceeds remaining data"
        )));
    }
    let credential_id = CredentialId::new(rest[..id_len].to_vec())?;
    *rest = &rest[id_len..];

    let key_value: Value = ciborium::from_reader(&mut *rest)
        .map_err(|e| CeremonyError::malformed(format!("invalid credential public key CBOR: {e}")))?;
    let public_key = CosePublicKey::from_cbor(&key_value)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id,
        public_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ed25519_key() -> CosePublicKey {
        let sk = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        CosePublicKey::EdDsa {
            x: sk.verifying_key().to_bytes(),
        }
    }

    fn registration_data(flags: u8) -> AuthenticatorData {
        AuthenticatorData {
            rp_id_hash: [9u8; 32],
            flags: AuthenticatorFlags::from_bits(flags),
            sign_count: 42,
            attested_credential: Some(AttestedCredentialData {
                aaguid: [3u8; 16],
                credential_id: CredentialId::new(vec![0xaa; 16]).unwrap(),
                public_key: ed25519_key(),
            }),
            extensions: None,
        }
    }

    #[test]
    fn test_parse_minimal_assertion_data() {
        let mut bytes = vec![0u8; 32];
        bytes.push(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED);
        bytes.extend_from_slice(&7u32.to_be_bytes());

        let data = AuthenticatorData::parse(&bytes).unwrap();
        assert!(data.flags.user_present());
        assert!(data.flags.user_verified());
        assert!(!data.flags.backup_eligible());
        assert_eq!(data.sign_count, 7);
        assert!(data.attested_credential.is_none());
    }

    #[test]
    fn test_parse_attested_credential() {
        let flags = AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA;
        let original = registration_data(flags);
        let parsed = AuthenticatorData::parse(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_extension_data_is_consumed() {
        let flags = AuthenticatorFlags::USER_PRESENT
            | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA
            | AuthenticatorFlags::EXTENSION_DATA;
        let mut original = registration_data(flags);
        original.extensions = Some(Value::Map(vec![(
            Value::Text("credProtect".into()),
            Value::Integer(2.into()),
        )]));
        let parsed = AuthenticatorData::parse(&original.to_bytes().unwrap()).unwrap();
        assert!(parsed.extensions.is_some());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = vec![0u8; 32];
        bytes.push(AuthenticatorFlags::USER_PRESENT);
        bytes.extend_from_slice(&[0, 0, 0, 1]);
        bytes.push(0xff);
        assert!(matches!(
            AuthenticatorData::parse(&bytes),
            Err(CeremonyError::Malformed(_))
        ));
    }

    #[test]
    fn test_too_short_rejected() {
        assert!(AuthenticatorData::parse(&[0u8; 36]).is_err());
    }

    #[test]
    fn test_backup_state_without_eligibility_rejected() {
        let mut bytes = vec![0u8; 32];
        bytes.push(AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::BACKUP_STATE);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert!(AuthenticatorData::parse(&bytes).is_err());
    }

    #[test]
    fn test_truncated_credential_id_rejected() {
        let flags = AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA;
        let bytes = registration_data(flags).to_bytes().unwrap();
        // Cut inside the credential ID
        assert!(AuthenticatorData::parse(&bytes[..60]).is_err());
    }
}
