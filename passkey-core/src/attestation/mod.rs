//! Attestation objects and attestation statement verification.
//!
//! The attestation object is CBOR-encoded per W3C WebAuthn §6.5.4:
//! ```text
//! { "fmt": text, "attStmt": map, "authData": bytes }
//! ```
//!
//! Statement verification dispatches on the declared format through a closed
//! registry. Only `none` and self-attested `packed` are implemented; every
//! other format, including any tag this crate has never heard of, fails
//! closed with [`CeremonyError::UnsupportedFormat`].

mod none;
mod packed;

use ciborium::Value;
use serde::{Deserialize, Serialize};

use crate::error::{CeremonyError, Result};
use crate::protocol::AuthenticatorData;

/// Attestation statement format tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttestationFormat {
    /// No attestation
    None,
    /// Standard packed format
    Packed,
    /// TPM attestation (Windows)
    Tpm,
    /// Android Key attestation
    AndroidKey,
    /// Android SafetyNet (legacy)
    AndroidSafetyNet,
    /// FIDO U2F
    FidoU2f,
    /// Apple anonymous attestation
    Apple,
    /// Unregistered format tag
    Other(String),
}

impl AttestationFormat {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Packed => "packed",
            Self::Tpm => "tpm",
            Self::AndroidKey => "android-key",
            Self::AndroidSafetyNet => "android-safetynet",
            Self::FidoU2f => "fido-u2f",
            Self::Apple => "apple",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for AttestationFormat {
    fn from(tag: &str) -> Self {
        match tag {
            "none" => Self::None,
            "packed" => Self::Packed,
            "tpm" => Self::Tpm,
            "android-key" => Self::AndroidKey,
            "android-safetynet" => Self::AndroidSafetyNet,
            "fido-u2f" => Self::FidoU2f,
            "apple" => Self::Apple,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for AttestationFormat {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<AttestationFormat> for String {
    fn from(format: AttestationFormat) -> Self {
        format.as_str().to_string()
    }
}

impl std::fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of trust the verified statement conveys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationType {
    /// No statement at all
    None,
    /// Signed by the credential key itself
    SelfAttestation,
}

/// Inputs shared by every statement verifier
pub(crate) struct StatementInput<'a> {
    pub statement: &'a [(Value, Value)],
    pub auth_data: &'a AuthenticatorData,
    pub auth_data_raw: &'a [u8],
    pub client_data_hash: &'a [u8; 32],
}

impl StatementInput<'_> {
    /// `authData || clientDataHash`, the bytes an attestation signature covers
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut signed = Vec::with_capacity(self.auth_data_raw.len() + 32);
        signed.extend_from_slice(self.auth_data_raw);
        signed.extend_from_slice(self.client_data_hash);
        signed
    }
}

/// Decoded attestation object
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub format: AttestationFormat,
    pub statement: Vec<(Value, Value)>,
    pub auth_data_raw: Vec<u8>,
    pub auth_data: AuthenticatorData,
}

impl AttestationObject {
    /// Decode a CBOR attestation object.
    ///
    /// The input must hold exactly one map with each of `fmt`, `attStmt` and
    /// `authData` present once.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let value: Value = ciborium::from_reader(&mut reader)
            .map_err(|e| CeremonyError::malformed(format!("invalid attestation object CBOR: {e}")))?;
        if !reader.is_empty() {
            return Err(CeremonyError::malformed(format!(
                "{} trailing bytes after attestation object",
                reader.len()
            )));
        }
        let map = value
            .into_map()
            .map_err(|_| CeremonyError::malformed("attestation object is not a CBOR map"))?;

        let mut format = None;
        let mut statement = None;
        let mut auth_data_raw = None;
        for (key, value) in map {
            let Some(name) = key.as_text() else { continue };
            let repeated = match name {
                "fmt" => format
                    .replace(value.into_text().map_err(|_| wrong_type("fmt"))?)
                    .is_some(),
                "attStmt" => statement
                    .replace(value.into_map().map_err(|_| wrong_type("attStmt"))?)
                    .is_some(),
                "authData" => auth_data_raw
                    .replace(value.into_bytes().map_err(|_| wrong_type("authData"))?)
                    .is_some(),
                _ => false,
            };
            if repeated {
                return Err(CeremonyError::malformed(format!(
                    "attestation object repeats {name}"
                )));
            }
        }

        let format = format
            .ok_or_else(|| CeremonyError::malformed("attestation object missing fmt"))?;
        let statement = statement
            .ok_or_else(|| CeremonyError::malformed("attestation object missing attStmt"))?;
        let auth_data_raw = auth_data_raw
            .ok_or_else(|| CeremonyError::malformed("attestation object missing authData"))?;
        let auth_data = AuthenticatorData::parse(&auth_data_raw)?;

        Ok(Self {
            format: AttestationFormat::from(format),
            statement,
            auth_data_raw,
            auth_data,
        })
    }

    /// Encode an attestation object from its parts.
    pub fn encode(
        format: &AttestationFormat,
        statement: Vec<(Value, Value)>,
        auth_data_raw: &[u8],
    ) -> Result<Vec<u8>> {
        let value = Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(format.as_str().into())),
            (Value::Text("attStmt".into()), Value::Map(statement)),
            (
                Value::Text("authData".into()),
                Value::Bytes(auth_data_raw.to_vec()),
            ),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&value, &mut out)
            .map_err(|e| CeremonyError::malformed(format!("attestation object encode: {e}")))?;
        Ok(out)
    }

    /// Verify the attestation statement against its declared format.
    pub fn verify_statement(&self, client_data_hash: &[u8; 32]) -> Result<AttestationType> {
        let input = StatementInput {
            statement: &self.statement,
            auth_data: &self.auth_data,
            auth_data_raw: &self.auth_data_raw,
            client_data_hash,
        };
        match &self.format {
            AttestationFormat::None => none::verify(&input),
            AttestationFormat::Packed => packed::verify(&input),
            unsupported => Err(CeremonyError::UnsupportedFormat(unsupported.to_string())),
        }
    }
}

/// Look up a text-keyed entry in a CBOR map.
pub(crate) fn text_field<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find_map(|(k, v)| (k.as_text() == Some(key)).then_some(v))
}

fn wrong_type(field: &str) -> CeremonyError {
    CeremonyError::malformed(format!("attestation object {field} has the wrong CBOR type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AuthenticatorFlags;

    fn minimal_auth_data() -> Vec<u8> {
        let mut data = vec![0u8; 32];
        data.push(AuthenticatorFlags::USER_PRESENT);
        data.extend_from_slice(&[0, 0, 0, 0]);
        data
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(AttestationFormat::from("android-key"), AttestationFormat::AndroidKey);
        assert_eq!(
            AttestationFormat::from("x-custom"),
            AttestationFormat::Other("x-custom".into())
        );
        assert_eq!(AttestationFormat::FidoU2f.to_string(), "fido-u2f");
        assert_eq!(
            serde_json::to_string(&AttestationFormat::Packed).unwrap(),
            "\"packed\""
        );
    }

    #[test]
    fn test_decode_attestation_object() {
        let bytes =
            AttestationObject::encode(&AttestationFormat::None, vec![], &minimal_auth_data())
                .unwrap();
        let obj = AttestationObject::decode(&bytes).unwrap();
        assert_eq!(obj.format, AttestationFormat::None);
        assert!(obj.statement.is_empty());
        assert!(obj.auth_data.flags.user_present());
    }

    #[test]
    fn test_unknown_formats_fail_closed() {
        for tag in ["tpm", "android-key", "android-safetynet", "fido-u2f", "apple", "x-custom"] {
            let bytes = AttestationObject::encode(
                &AttestationFormat::from(tag),
                vec![],
                &minimal_auth_data(),
            )
            .unwrap();
            let obj = AttestationObject::decode(&bytes).unwrap();
            assert_eq!(
                obj.verify_statement(&[0u8; 32]),
                Err(CeremonyError::UnsupportedFormat(tag.to_string()))
            );
        }
    }

    #[test]
    fn test_missing_fields_rejected() {
        let value = Value::Map(vec![(Value::Text("fmt".into()), Value::Text("none".into()))]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();
        assert!(matches!(
            AttestationObject::decode(&bytes),
            Err(CeremonyError::Malformed(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes =
            AttestationObject::encode(&AttestationFormat::None, vec![], &minimal_auth_data())
                .unwrap();
        bytes.push(0x00);
        assert!(matches!(
            AttestationObject::decode(&bytes),
            Err(CeremonyError::Malformed(msg)) if msg.contains("trailing")
        ));
    }

    #[test]
    fn test_repeated_keys_rejected() {
        for repeated in ["fmt", "attStmt", "authData"] {
            let mut entries = vec![
                (Value::Text("fmt".into()), Value::Text("none".into())),
                (Value::Text("attStmt".into()), Value::Map(vec![])),
                (Value::Text("authData".into()), Value::Bytes(minimal_auth_data())),
            ];
            let extra = entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(repeated))
                .cloned()
                .unwrap();
            entries.push(extra);
            let mut bytes = Vec::new();
            ciborium::into_writer(&Value::Map(entries), &mut bytes).unwrap();
            assert!(matches!(
                AttestationObject::decode(&bytes),
                Err(CeremonyError::Malformed(msg)) if msg.contains(repeated)
            ));
        }
    }
}
