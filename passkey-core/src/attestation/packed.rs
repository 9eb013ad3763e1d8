//! `packed` attestation (W3C WebAuthn §8.2), self-attestation only.
//!
//! ```text
//! attStmt = { "alg": int, "sig": bytes }            ; self attestation
//! attStmt = { "alg": int, "sig": bytes, "x5c": [..] } ; full attestation
//! ```
//!
//! Full attestation needs a trust-anchor policy this crate does not carry,
//! so certificate chains are refused rather than silently accepted.

use ciborium::Value;

use super::{text_field, AttestationType, StatementInput};
use crate::error::{CeremonyError, Result};

pub(crate) fn verify(input: &StatementInput<'_>) -> Result<AttestationType> {
    if text_field(input.statement, "x5c").is_some() {
        return Err(CeremonyError::UnsupportedFormat("packed (x5c)".into()));
    }
    if text_field(input.statement, "ecdaaKeyId").is_some() {
        return Err(CeremonyError::UnsupportedFormat("packed (ecdaa)".into()));
    }

    let alg = text_field(input.statement, "alg")
        .and_then(Value::as_integer)
        .and_then(|i| i64::try_from(i).ok())
        .ok_or_else(|| CeremonyError::malformed("packed statement missing alg"))?;
    let sig = text_field(input.statement, "sig")
        .and_then(Value::as_bytes)
        .ok_or_else(|| CeremonyError::malformed("packed statement missing sig"))?;

    let attested = input
        .auth_data
        .attested_credential
        .as_ref()
        .ok_or_else(|| CeremonyError::malformed("attested credential data missing"))?;

    if attested.public_key.algorithm().id() != alg {
        return Err(CeremonyError::malformed(format!(
            "packed alg {alg} does not match credential key {}",
            attested.public_key.algorithm()
        )));
    }

    attested.public_key.verify(&input.signed_bytes(), sig)?;
    Ok(AttestationType::SelfAttestation)
}
