#![no_main]

//! Fuzz target for the assertion path
//!
//! Splits the input into clientDataJSON, authenticator data and signature
//! and runs full assertion verification against a fixed credential.
//!
//! Run with: cargo +nightly fuzz run fuzz_assertion

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use passkey_core::{
    verify_assertion, AttestationFormat, CosePublicKey, Credential, CredentialId, RelyingParty,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let split_a = (data[0] as usize) % data.len();
    let split_b = split_a + (data[1] as usize) % (data.len() - split_a);
    let (client_data, rest) = data.split_at(split_a);
    let (auth_data, signature) = rest.split_at(split_b - split_a);

    let Ok(rp) = RelyingParty::new("localhost", "Fuzz", ["http://localhost:8080"]) else {
        return;
    };
    let Ok(id) = CredentialId::new(vec![1u8; 16]) else {
        return;
    };
    let credential = Credential {
        id,
        public_key: CosePublicKey::EdDsa { x: [9u8; 32] },
        sign_count: 0,
        transports: Vec::new(),
        attestation_format: AttestationFormat::None,
        aaguid: [0u8; 16],
        user_verified: false,
        backup_eligible: false,
        backup_state: false,
        created_at: Utc::now(),
        last_used_at: None,
    };

    let _ = verify_assertion(
        client_data,
        auth_data,
        signature,
        &credential,
        &[0u8; 32],
        &rp,
        false,
    );
});
