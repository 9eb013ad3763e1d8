//! Software authenticator producing real attestations and assertions.
//!
//! Holds a single credential. Used by tests and by the `passkey` CLI, which
//! persists it as JSON between runs; it is never wired into the server.

use ciborium::Value;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::attestation::{AttestationFormat, AttestationObject};
use crate::base64url;
use crate::cose::{CoseAlgorithm, CosePublicKey};
use crate::credential::CredentialId;
use crate::error::{CeremonyError, Result};
use crate::protocol::{
    AttestedCredentialData, AuthenticationResponse, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorData, AuthenticatorFlags, CollectedClientData,
    PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions, RegistrationResponse,
    PUBLIC_KEY_TYPE, TYPE_CREATE, TYPE_GET,
};

/// AAGUID reported by the software authenticator
pub const SOFT_AAGUID: [u8; 16] = *b"passkey-soft-aut";

const CREDENTIAL_ID_LEN: usize = 32;

/// Attestation statement the authenticator emits at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftAttestation {
    #[default]
    None,
    PackedSelf,
}

/// Single-credential software authenticator
#[derive(Clone, Serialize, Deserialize)]
pub struct SoftAuthenticator {
    algorithm: CoseAlgorithm,
    #[serde(with = "hex::serde")]
    secret: [u8; 32],
    credential_id: CredentialId,
    public_key: CosePublicKey,
    sign_count: u32,
    counter_step: u32,
    flags: u8,
    #[serde(default, with = "base64url::option")]
    user_handle: Option<Vec<u8>>,
}

impl SoftAuthenticator {
    /// Generate a fresh key pair and credential ID from the OS CSPRNG.
    pub fn new(algorithm: CoseAlgorithm) -> Self {
        let (secret, public_key) = match algorithm {
            CoseAlgorithm::Es256 => {
                let sk = p256::ecdsa::SigningKey::random(&mut OsRng);
                let mut secret = [0u8; 32];
                secret.copy_from_slice(&sk.to_bytes());
                (secret, es256_public_key(&sk))
            }
            CoseAlgorithm::EdDsa => {
                let sk = ed25519_dalek::SigningKey::generate(&mut OsRng);
                let public_key = CosePublicKey::EdDsa {
                    x: sk.verifying_key().to_bytes(),
                };
                (sk.to_bytes(), public_key)
            }
        };

        let mut id = vec![0u8; CREDENTIAL_ID_LEN];
        OsRng.fill_bytes(&mut id);

        Self {
            algorithm,
            secret,
            credential_id: CredentialId(id),
            public_key,
            sign_count: 0,
            counter_step: 1,
            flags: AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED,
            user_handle: None,
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.algorithm
    }

    pub fn credential_id(&self) -> &CredentialId {
        &self.credential_id
    }

    pub fn public_key(&self) -> &CosePublicKey {
        &self.public_key
    }

    pub fn sign_count(&self) -> u32 {
        self.sign_count
    }

    /// Set the stored counter; the next assertion reports `count + step`.
    pub fn set_sign_count(&mut self, count: u32) {
        self.sign_count = count;
    }

    /// Counter increment per assertion (0 emulates an authenticator without counters).
    pub fn set_counter_step(&mut self, step: u32) {
        self.counter_step = step;
    }

    /// UP/UV/BE/BS flag bits reported in every response.
    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    /// Build a raw attestation object for `client_data_json`.
    pub fn make_attestation(
        &mut self,
        rp_id_hash: &[u8; 32],
        client_data_json: &[u8],
        format: SoftAttestation,
    ) -> Result<Vec<u8>> {
        let auth_data = AuthenticatorData {
            rp_id_hash: *rp_id_hash,
            flags: AuthenticatorFlags::from_bits(
                self.flags | AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA,
            ),
            sign_count: self.sign_count,
            attested_credential: Some(AttestedCredentialData {
                aaguid: SOFT_AAGUID,
                credential_id: self.credential_id.clone(),
                public_key: self.public_key.clone(),
            }),
            extensions: None,
        }
        .to_bytes()?;

        match format {
            SoftAttestation::None => {
                AttestationObject::encode(&AttestationFormat::None, Vec::new(), &auth_data)
            }
            SoftAttestation::PackedSelf => {
                let mut signed = auth_data.clone();
                signed.extend_from_slice(&Sha256::digest(client_data_json));
                let statement = vec![
                    (
                        Value::Text("alg".into()),
                        Value::Integer(self.algorithm.id().into()),
                    ),
                    (Value::Text("sig".into()), Value::Bytes(self.sign(&signed))),
                ];
                AttestationObject::encode(&AttestationFormat::Packed, statement, &auth_data)
            }
        }
    }

    /// Advance the counter and sign `authData || SHA-256(clientDataJSON)`.
    ///
    /// Returns `(authenticatorData, signature)`.
    pub fn make_assertion(
        &mut self,
        rp_id_hash: &[u8; 32],
        client_data_json: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.sign_count = self.sign_count.wrapping_add(self.counter_step);
        let auth_data = AuthenticatorData {
            rp_id_hash: *rp_id_hash,
            flags: AuthenticatorFlags::from_bits(self.flags),
            sign_count: self.sign_count,
            attested_credential: None,
            extensions: None,
        }
        .to_bytes()?;

        let mut signed = auth_data.clone();
        signed.extend_from_slice(&Sha256::digest(client_data_json));
        let signature = self.sign(&signed);
        Ok((auth_data, signature))
    }

    /// Answer `navigator.credentials.create()` options as a browser would.
    pub fn register(
        &mut self,
        options: &PublicKeyCredentialCreationOptions,
        origin: &str,
        format: SoftAttestation,
    ) -> Result<RegistrationResponse> {
        if !options
            .pub_key_cred_params
            .iter()
            .any(|p| p.alg == self.algorithm.id())
        {
            return Err(CeremonyError::UnsupportedAlgorithm(self.algorithm.id()));
        }
        let challenge = decode_challenge(&options.challenge)?;
        let user_handle = base64url::decode(&options.user.id)
            .map_err(|_| CeremonyError::malformed("user id is not base64url"))?;

        let client_data = CollectedClientData::new(TYPE_CREATE, &challenge, origin).to_json_bytes();
        let rp_id_hash: [u8; 32] = Sha256::digest(options.rp.id.as_bytes()).into();
        let attestation_object = self.make_attestation(&rp_id_hash, &client_data, format)?;
        self.user_handle = Some(user_handle);

        Ok(RegistrationResponse {
            id: self.credential_id.to_string(),
            raw_id: self.credential_id.as_bytes().to_vec(),
            response: AuthenticatorAttestationResponse {
                client_data_json: client_data,
                attestation_object,
                transports: vec!["internal".to_string()],
            },
            type_: PUBLIC_KEY_TYPE.to_string(),
            authenticator_attachment: Some("platform".to_string()),
        })
    }

    /// Answer `navigator.credentials.get()` options as a browser would.
    pub fn authenticate(
        &mut self,
        options: &PublicKeyCredentialRequestOptions,
        origin: &str,
    ) -> Result<AuthenticationResponse> {
        if !options.allow_credentials.is_empty()
            && !options
                .allow_credentials
                .iter()
                .any(|d| d.id == self.credential_id)
        {
            return Err(CeremonyError::NotFound("credential"));
        }
        let challenge = decode_challenge(&options.challenge)?;

        let client_data = CollectedClientData::new(TYPE_GET, &challenge, origin).to_json_bytes();
        let rp_id_hash: [u8; 32] = Sha256::digest(options.rp_id.as_bytes()).into();
        let (authenticator_data, signature) = self.make_assertion(&rp_id_hash, &client_data)?;

        Ok(AuthenticationResponse {
            id: self.credential_id.to_string(),
            raw_id: self.credential_id.as_bytes().to_vec(),
            response: AuthenticatorAssertionResponse {
                client_data_json: client_data,
                authenticator_data,
                signature,
                user_handle: self.user_handle.clone(),
            },
            type_: PUBLIC_KEY_TYPE.to_string(),
            authenticator_attachment: Some("platform".to_string()),
        })
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self.algorithm {
            CoseAlgorithm::Es256 => {
                use p256::ecdsa::signature::Signer;
                // A corrupt secret yields an empty signature, which never verifies.
                match p256::ecdsa::SigningKey::from_bytes(p256::FieldBytes::from_slice(
                    &self.secret,
                )) {
                    Ok(sk) => {
                        let sig: p256::ecdsa::Signature = sk.sign(message);
                        sig.to_der().as_bytes().to_vec()
                    }
                    Err(_) => Vec::new(),
                }
            }
            CoseAlgorithm::EdDsa => {
                use ed25519_dalek::Signer;
                let sk = ed25519_dalek::SigningKey::from_bytes(&self.secret);
                sk.sign(message).to_bytes().to_vec()
            }
        }
    }
}

impl std::fmt::Debug for SoftAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftAuthenticator")
            .field("algorithm", &self.algorithm)
            .field("credential_id", &self.credential_id)
            .field("sign_count", &self.sign_count)
            .finish_non_exhaustive()
    }
}

impl Drop for SoftAuthenticator {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

fn es256_public_key(sk: &p256::ecdsa::SigningKey) -> CosePublicKey {
    let point = sk.verifying_key().to_encoded_point(false);
    let bytes = point.as_bytes();
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[1..33]);
    y.copy_from_slice(&bytes[33..65]);
    CosePublicKey::Es256 { x, y }
}

fn decode_challenge(challenge: &str) -> Result<Vec<u8>> {
    base64url::decode(challenge).map_err(|_| CeremonyError::malformed("challenge is not base64url"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_survives_json() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        authenticator.set_sign_count(7);
        let json = serde_json::to_string(&authenticator).unwrap();
        let restored: SoftAuthenticator = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.credential_id(), authenticator.credential_id());
        assert_eq!(restored.public_key(), authenticator.public_key());
        assert_eq!(restored.sign_count(), 7);

        // The restored key still produces signatures the public key accepts
        let message = b"restored";
        let signature = restored.sign(message);
        assert!(restored.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_assertion_advances_counter() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::EdDsa);
        authenticator.make_assertion(&[0u8; 32], b"{}").unwrap();
        authenticator.make_assertion(&[0u8; 32], b"{}").unwrap();
        assert_eq!(authenticator.sign_count(), 2);
    }

    #[test]
    fn test_debug_hides_secret() {
        let authenticator = SoftAuthenticator::new(CoseAlgorithm::EdDsa);
        let debug = format!("{authenticator:?}");
        assert!(!debug.contains(&hex::encode(authenticator.secret)));
    }
}
