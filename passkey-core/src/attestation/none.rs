//! `none` attestation: the authenticator makes no claim about its provenance.

use super::{AttestationType, StatementInput};
use crate::error::{CeremonyError, Result};

pub(crate) fn verify(input: &StatementInput<'_>) -> Result<AttestationType> {
    if !input.statement.is_empty() {
        return Err(CeremonyError::malformed(
            "none attestation carries a non-empty statement",
        ));
    }
    Ok(AttestationType::None)
}
