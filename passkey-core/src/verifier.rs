//! Attestation (registration) and assertion (login) verification.
//!
//! Both paths share the client-data checks and run them in the same order:
//! ceremony type, challenge, origin, RP ID hash, user presence, user
//! verification. The first failing check decides the error.

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::attestation::AttestationObject;
use crate::credential::Credential;
use crate::error::{CeremonyError, Result};
use crate::protocol::{AuthenticatorData, ClientData, TYPE_CREATE, TYPE_GET};
use crate::relying_party::RelyingParty;

/// What a successful assertion reports back to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionOutcome {
    pub sign_count: u32,
    pub user_verified: bool,
    pub backup_state: bool,
}

/// Verify a registration response and build the credential record it proves.
///
/// The returned credential carries no transports; those are client hints and
/// are attached by the caller.
pub fn verify_attestation(
    client_data_json: &[u8],
    attestation_object: &[u8],
    expected_challenge: &[u8],
    rp: &RelyingParty,
    user_verification_required: bool,
    now: DateTime<Utc>,
) -> Result<Credential> {
    let client_data = ClientData::parse(client_data_json)?;
    check_client_data(&client_data, TYPE_CREATE, expected_challenge, rp)?;

    let attestation = AttestationObject::decode(attestation_object)?;
    check_auth_data(&attestation.auth_data, rp, user_verification_required)?;

    let attested = attestation
        .auth_data
        .attested_credential
        .as_ref()
        .ok_or_else(|| CeremonyError::malformed("attested credential data missing"))?;

    let attestation_type = attestation.verify_statement(&client_data.hash)?;
    debug!(
        format = %attestation.format,
        ?attestation_type,
        alg = %attested.public_key.algorithm(),
        "Attestation statement verified"
    );

    let flags = attestation.auth_data.flags;
    Ok(Credential {
        id: attested.credential_id.clone(),
        public_key: attested.public_key.clone(),
        sign_count: attestation.auth_data.sign_count,
        transports: Vec::new(),
        attestation_format: attestation.format.clone(),
        aaguid: attested.aaguid,
        user_verified: flags.user_verified(),
        backup_eligible: flags.backup_eligible(),
        backup_state: flags.backup_state(),
        created_at: now,
        last_used_at: None,
    })
}

/// Verify an assertion against a stored credential.
pub fn verify_assertion(
    client_data_json: &[u8],
    authenticator_data: &[u8],
    signature: &[u8],
    credential: &Credential,
    expected_challenge: &[u8],
    rp: &RelyingParty,
    user_verification_required: bool,
) -> Result<AssertionOutcome> {
    let client_data = ClientData::parse(client_data_json)?;
    check_client_data(&client_data, TYPE_GET, expected_challenge, rp)?;

    let auth_data = AuthenticatorData::parse(authenticator_data)?;
    check_auth_data(&auth_data, rp, user_verification_required)?;

    let mut signed = Vec::with_capacity(authenticator_data.len() + 32);
    signed.extend_from_slice(authenticator_data);
    signed.extend_from_slice(&client_data.hash);
    credential.public_key.verify(&signed, signature)?;

    if !credential.verify_counter(auth_data.sign_count) {
        return Err(CeremonyError::CounterRegression {
            stored: credential.sign_count,
            reported: auth_data.sign_count,
        });
    }

    Ok(AssertionOutcome {
        sign_count: auth_data.sign_count,
        user_verified: auth_data.flags.user_verified(),
        backup_state: auth_data.flags.backup_state(),
    })
}

fn check_client_data(
    client_data: &ClientData,
    expected_type: &'static str,
    expected_challenge: &[u8],
    rp: &RelyingParty,
) -> Result<()> {
    let collected = &client_data.collected;
    if collected.ceremony_type != expected_type {
        return Err(CeremonyError::WrongCeremonyType {
            expected: expected_type,
            found: collected.ceremony_type.clone(),
        });
    }

    let challenge = client_data
        .challenge()
        .map_err(|_| CeremonyError::ChallengeMismatch)?;
    if !bool::from(challenge.as_slice().ct_eq(expected_challenge)) {
        return Err(CeremonyError::ChallengeMismatch);
    }

    if !rp.accepts_origin(&collected.origin) {
        return Err(CeremonyError::OriginMismatch(collected.origin.clone()));
    }
    // Embedded (cross-origin iframe) ceremonies are not offered.
    if collected.cross_origin == Some(true) {
        return Err(CeremonyError::OriginMismatch(format!(
            "{} (cross-origin)",
            collected.origin
        )));
    }
    Ok(())
}

fn check_auth_data(
    auth_data: &AuthenticatorData,
    rp: &RelyingParty,
    user_verification_required: bool,
) -> Result<()> {
    if !bool::from(auth_data.rp_id_hash.as_slice().ct_eq(rp.id_hash().as_slice())) {
        return Err(CeremonyError::RpIdHashMismatch);
    }
    if !auth_data.flags.user_present() {
        return Err(CeremonyError::UserNotPresent);
    }
    if user_verification_required && !auth_data.flags.user_verified() {
        return Err(CeremonyError::UserNotVerified);
    }
    Ok(())
}

#[cfg(all(test, feature = "soft-authenticator"))]
mod tests {
    use super::*;
    use crate::attestation::AttestationFormat;
    use crate::authenticator::{SoftAttestation, SoftAuthenticator};
    use crate::cose::CoseAlgorithm;
    use crate::protocol::{AuthenticatorFlags, CollectedClientData};

    const ORIGIN: &str = "http://localhost:8080";
    const CHALLENGE: [u8; 32] = [0x42; 32];

    fn rp() -> RelyingParty {
        RelyingParty::new("localhost", "Passkey Demo", [ORIGIN]).unwrap()
    }

    fn attest(
        authenticator: &mut SoftAuthenticator,
        format: SoftAttestation,
    ) -> (Vec<u8>, Vec<u8>) {
        let client_data = CollectedClientData::new(TYPE_CREATE, &CHALLENGE, ORIGIN).to_json_bytes();
        let object = authenticator
            .make_attestation(rp().id_hash(), &client_data, format)
            .unwrap();
        (client_data, object)
    }

    fn registered(authenticator: &mut SoftAuthenticator) -> Credential {
        let (client_data, object) = attest(authenticator, SoftAttestation::None);
        verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()).unwrap()
    }

    #[test]
    fn test_attestation_none_builds_credential() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let credential = registered(&mut authenticator);
        assert_eq!(&credential.id, authenticator.credential_id());
        assert_eq!(credential.attestation_format, AttestationFormat::None);
        assert_eq!(credential.sign_count, 0);
        assert_eq!(&credential.public_key, authenticator.public_key());
    }

    #[test]
    fn test_attestation_packed_self() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::EdDsa);
        let (client_data, object) = attest(&mut authenticator, SoftAttestation::PackedSelf);
        let credential =
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now())
                .unwrap();
        assert_eq!(credential.attestation_format, AttestationFormat::Packed);
    }

    #[test]
    fn test_attestation_wrong_challenge() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let (client_data, object) = attest(&mut authenticator, SoftAttestation::None);
        assert_eq!(
            verify_attestation(&client_data, &object, &[0u8; 32], &rp(), false, Utc::now()),
            Err(CeremonyError::ChallengeMismatch)
        );
    }

    #[test]
    fn test_attestation_wrong_type() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let client_data = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN).to_json_bytes();
        let object = authenticator
            .make_attestation(rp().id_hash(), &client_data, SoftAttestation::None)
            .unwrap();
        assert!(matches!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()),
            Err(CeremonyError::WrongCeremonyType { .. })
        ));
    }

    #[test]
    fn test_attestation_foreign_origin() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let client_data =
            CollectedClientData::new(TYPE_CREATE, &CHALLENGE, "https://evil.example").to_json_bytes();
        let object = authenticator
            .make_attestation(rp().id_hash(), &client_data, SoftAttestation::None)
            .unwrap();
        assert_eq!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()),
            Err(CeremonyError::OriginMismatch("https://evil.example".into()))
        );
    }

    #[test]
    fn test_attestation_cross_origin_rejected() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let mut collected = CollectedClientData::new(TYPE_CREATE, &CHALLENGE, ORIGIN);
        collected.cross_origin = Some(true);
        let client_data = collected.to_json_bytes();
        let object = authenticator
            .make_attestation(rp().id_hash(), &client_data, SoftAttestation::None)
            .unwrap();
        assert!(matches!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()),
            Err(CeremonyError::OriginMismatch(_))
        ));
    }

    #[test]
    fn test_attestation_rp_id_hash_mismatch() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let client_data = CollectedClientData::new(TYPE_CREATE, &CHALLENGE, ORIGIN).to_json_bytes();
        let object = authenticator
            .make_attestation(&[0u8; 32], &client_data, SoftAttestation::None)
            .unwrap();
        assert_eq!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()),
            Err(CeremonyError::RpIdHashMismatch)
        );
    }

    #[test]
    fn test_attestation_user_not_present() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        authenticator.set_flags(0);
        let (client_data, object) = attest(&mut authenticator, SoftAttestation::None);
        assert_eq!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()),
            Err(CeremonyError::UserNotPresent)
        );
    }

    #[test]
    fn test_attestation_user_verification_required() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        authenticator.set_flags(AuthenticatorFlags::USER_PRESENT);
        let (client_data, object) = attest(&mut authenticator, SoftAttestation::None);
        assert_eq!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), true, Utc::now()),
            Err(CeremonyError::UserNotVerified)
        );
        // Same response passes when UV is only preferred
        assert!(
            verify_attestation(&client_data, &object, &CHALLENGE, &rp(), false, Utc::now()).is_ok()
        );
    }

    #[test]
    fn test_assertion_verifies_and_reports_counter() {
        for alg in [CoseAlgorithm::Es256, CoseAlgorithm::EdDsa] {
            let mut authenticator = SoftAuthenticator::new(alg);
            let credential = registered(&mut authenticator);
            let client_data = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN).to_json_bytes();
            let (auth_data, signature) = authenticator
                .make_assertion(rp().id_hash(), &client_data)
                .unwrap();

            let outcome = verify_assertion(
                &client_data,
                &auth_data,
                &signature,
                &credential,
                &CHALLENGE,
                &rp(),
                false,
            )
            .unwrap();
            assert_eq!(outcome.sign_count, 1);
            assert!(outcome.user_verified);
        }
    }

    #[test]
    fn test_assertion_bad_signature() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let credential = registered(&mut authenticator);
        let client_data = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN).to_json_bytes();
        let (auth_data, signature) = authenticator
            .make_assertion(rp().id_hash(), &client_data)
            .unwrap();

        // Signature over different client data
        let other = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN);
        let mut other_json = other.to_json_bytes();
        other_json.push(b' ');
        assert_eq!(
            verify_assertion(
                &other_json,
                &auth_data,
                &signature,
                &credential,
                &CHALLENGE,
                &rp(),
                false
            ),
            Err(CeremonyError::SignatureInvalid)
        );
    }

    #[test]
    fn test_assertion_counter_regression() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
        let mut credential = registered(&mut authenticator);
        credential.sign_count = 10;
        authenticator.set_sign_count(9);
        let client_data = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN).to_json_bytes();
        let (auth_data, signature) = authenticator
            .make_assertion(rp().id_hash(), &client_data)
            .unwrap();
        assert_eq!(
            verify_assertion(
                &client_data,
                &auth_data,
                &signature,
                &credential,
                &CHALLENGE,
                &rp(),
                false
            ),
            Err(CeremonyError::CounterRegression {
                stored: 10,
                reported: 10
            })
        );
    }

    #[test]
    fn test_assertion_zero_counter_authenticator() {
        let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::EdDsa);
        authenticator.set_counter_step(0);
        let credential = registered(&mut authenticator);
        let client_data = CollectedClientData::new(TYPE_GET, &CHALLENGE, ORIGIN).to_json_bytes();
        let (auth_data, signature) = authenticator
            .make_assertion(rp().id_hash(), &client_data)
            .unwrap();
        let outcome = verify_assertion(
            &client_data,
            &auth_data,
            &signature,
            &credential,
            &CHALLENGE,
            &rp(),
            false,
        )
        .unwrap();
        assert_eq!(outcome.sign_count, 0);
    }
}
