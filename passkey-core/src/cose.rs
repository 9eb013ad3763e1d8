//! COSE public keys (RFC 9052/9053) as carried in attested credential data.
//!
//! Only the algorithms this relying party offers are decoded: ES256 (EC2 key on
//! P-256) and EdDSA (OKP key on Ed25519). Anything else fails closed.

use ciborium::value::{Integer, Value};
use serde::{Deserialize, Serialize};

use crate::error::{CeremonyError, Result};

const KEY_KTY: i64 = 1;
const KEY_ALG: i64 = 3;
const KEY_CRV: i64 = -1;
const KEY_X: i64 = -2;
const KEY_Y: i64 = -3;

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;

const CRV_P256: i64 = 1;
const CRV_ED25519: i64 = 6;

/// Signature algorithms accepted for new credentials, in preference order.
pub const SUPPORTED_ALGORITHMS: &[CoseAlgorithm] = &[CoseAlgorithm::Es256, CoseAlgorithm::EdDsa];

/// COSE algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoseAlgorithm {
    /// ECDSA with SHA-256 on P-256
    Es256,
    /// Ed25519
    EdDsa,
}

impl CoseAlgorithm {
    pub fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::EdDsa => -8,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            -7 => Some(Self::Es256),
            -8 => Some(Self::EdDsa),
            _ => None,
        }
    }
}

impl std::fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Es256 => write!(f, "ES256"),
            Self::EdDsa => write!(f, "EdDSA"),
        }
    }
}

/// Algorithm-tagged credential public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alg", rename_all = "UPPERCASE")]
pub enum CosePublicKey {
    Es256 {
        #[serde(with = "hex::serde")]
        x: [u8; 32],
        #[serde(with = "hex::serde")]
        y: [u8; 32],
    },
    EdDsa {
        #[serde(with = "hex::serde")]
        x: [u8; 32],
    },
}

impl CosePublicKey {
    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Es256 { .. } => CoseAlgorithm::Es256,
            Self::EdDsa { .. } => CoseAlgorithm::EdDsa,
        }
    }

    /// Decode a COSE_Key map, validating that the key material is usable.
    pub fn from_cbor(value: &Value) -> Result<Self> {
        let map = value
            .as_map()
            .ok_or_else(|| CeremonyError::malformed("COSE key is not a CBOR map"))?;

        let kty = int_field(map, KEY_KTY)?;
        let alg = int_field(map, KEY_ALG)?;
        let algorithm =
            CoseAlgorithm::from_id(alg).ok_or(CeremonyError::UnsupportedAlgorithm(alg))?;

        let key = match (algorithm, kty) {
            (CoseAlgorithm::Es256, KTY_EC2) => {
                if int_field(map, KEY_CRV)? != CRV_P256 {
                    return Err(CeremonyError::malformed("ES256 key is not on P-256"));
                }
                Self::Es256 {
                    x: coordinate(map, KEY_X)?,
                    y: coordinate(map, KEY_Y)?,
                }
            }
            (CoseAlgorithm::EdDsa, KTY_OKP) => {
                if int_field(map, KEY_CRV)? != CRV_ED25519 {
                    return Err(CeremonyError::malformed("EdDSA key is not Ed25519"));
                }
                Self::EdDsa {
                    x: coordinate(map, KEY_X)?,
                }
            }
            _ => {
                return Err(CeremonyError::malformed(format!(
                    "key type {kty} does not match algorithm {algorithm}"
                )))
            }
        };

        key.check_point()?;
        Ok(key)
    }

    /// Decode a COSE_Key from raw CBOR bytes.
    pub fn from_cbor_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| CeremonyError::malformed(format!("invalid COSE key CBOR: {e}")))?;
        Self::from_cbor(&value)
    }

    pub fn to_cbor(&self) -> Value {
        let int = |i: i64| Value::Integer(Integer::from(i));
        match self {
            Self::Es256 { x, y } => Value::Map(vec![
                (int(KEY_KTY), int(KTY_EC2)),
                (int(KEY_ALG), int(CoseAlgorithm::Es256.id())),
                (int(KEY_CRV), int(CRV_P256)),
                (int(KEY_X), Value::Bytes(x.to_vec())),
                (int(KEY_Y), Value::Bytes(y.to_vec())),
            ]),
            Self::EdDsa { x } => Value::Map(vec![
                (int(KEY_KTY), int(KTY_OKP)),
                (int(KEY_ALG), int(CoseAlgorithm::EdDsa.id())),
                (int(KEY_CRV), int(CRV_ED25519)),
                (int(KEY_X), Value::Bytes(x.to_vec())),
            ]),
        }
    }

    pub fn to_cbor_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::into_writer(&self.to_cbor(), &mut out)
            .map_err(|e| CeremonyError::malformed(format!("COSE key encode: {e}")))?;
        Ok(out)
    }

    /// Verify `signature` over `message` with this key.
    ///
    /// ES256 signatures are ASN.1 DER encoded as WebAuthn requires; EdDSA
    /// signatures are the raw 64-byte form.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::Es256 { .. } => {
                use p256::ecdsa::signature::Verifier;
                use p256::ecdsa::Signature;

                let key = self.p256_key()?;
                let sig =
                    Signature::from_der(signature).map_err(|_| CeremonyError::SignatureInvalid)?;
                key.verify(message, &sig)
                    .map_err(|_| CeremonyError::SignatureInvalid)
            }
            Self::EdDsa { x } => {
                let key = ed25519_dalek::VerifyingKey::from_bytes(x)
                    .map_err(|_| CeremonyError::malformed("invalid Ed25519 public key"))?;
                let sig = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|_| CeremonyError::SignatureInvalid)?;
                key.verify_strict(message, &sig)
                    .map_err(|_| CeremonyError::SignatureInvalid)
            }
        }
    }

    fn p256_key(&self) -> Result<p256::ecdsa::VerifyingKey> {
        match self {
            Self::Es256 { x, y } => {
                let point = p256::EncodedPoint::from_affine_coordinates(
                    p256::FieldBytes::from_slice(x),
                    p256::FieldBytes::from_slice(y),
                    false,
                );
                p256::ecdsa::VerifyingKey::from_encoded_point(&point)
                    .map_err(|_| CeremonyError::malformed("P-256 point is not on the curve"))
            }
            Self::EdDsa { .. } => Err(CeremonyError::malformed("not an EC2 key")),
        }
    }

    fn check_point(&self) -> Result<()> {
        match self {
            Self::Es256 { .. } => self.p256_key().map(|_| ()),
            Self::EdDsa { x } => ed25519_dalek::VerifyingKey::from_bytes(x)
                .map(|_| ())
                .map_err(|_| CeremonyError::malformed("invalid Ed25519 public key")),
        }
    }
}

/// Look up an integer-keyed entry in a CBOR map.
pub(crate) fn map_get(map: &[(Value, Value)], key: i64) -> Option<&Value> {
    map.iter().find_map(|(k, v)| {
        let k = i128::from(k.as_integer()?);
        (k == i128::from(key)).then_some(v)
    })
}

fn int_field(map: &[(Value, Value)], key: i64) -> Result<i64> {
    map_get(map, key)
        .and_then(Value::as_integer)
        .and_then(|i| i64::try_from(i).ok())
        .ok_or_else(|| CeremonyError::malformed(format!("COSE key missing integer label {key}")))
}

fn coordinate(map: &[(Value, Value)], key: i64) -> Result<[u8; 32]> {
    let bytes = map_get(map, key)
        .and_then(Value::as_bytes)
        .ok_or_else(|| CeremonyError::malformed(format!("COSE key missing bytes label {key}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CeremonyError::malformed(format!("COSE coordinate {key} is not 32 bytes")))
}
