//! Passkey Core - WebAuthn relying-party ceremony engine
//!
//! This crate implements the relying-party side of WebAuthn registration and
//! authentication: challenge lifecycle, credential records, attestation and
//! assertion verification, and the ceremony state machines that tie them
//! together. Storage is abstracted behind [`CredentialRepository`].
//!
//! # Features
//!
//! - Single-use challenges keyed by value, with lazy expiry
//! - `none` and self-attested `packed` attestation; every other format fails closed
//! - ES256 (P-256) and EdDSA (Ed25519) credential keys
//! - Monotonic sign counters enforced with compare-and-set
//! - Software authenticator for tests and tooling (`soft-authenticator` feature)
//!
//! # Example
//!
#![cfg_attr(feature = "soft-authenticator", doc = "```no_run")]
#![cfg_attr(not(feature = "soft-authenticator"), doc = "```ignore")]
//! use passkey_core::{
//!     CeremonyEngine, CoseAlgorithm, EngineConfig, MemoryRepository, RelyingParty,
//!     SoftAttestation, SoftAuthenticator, UserAccount, UserHandle,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rp = RelyingParty::new("localhost", "Passkey Demo", ["http://localhost:8080"])?;
//! let repository = MemoryRepository::new();
//! repository.provision_user(UserAccount::new(UserHandle::new(*b"alice-id")?, "alice", "Alice"))?;
//! let engine = CeremonyEngine::new(rp, repository, EngineConfig::default());
//!
//! let mut authenticator = SoftAuthenticator::new(CoseAlgorithm::Es256);
//! let (options, session) = engine.begin_registration("alice").await?;
//! let response = authenticator.register(&options, "http://localhost:8080", SoftAttestation::None)?;
//! engine.finish_registration("alice", &session.token(), &response).await?;
//!
//! let (options, session) = engine.begin_login("alice").await?;
//! let response = authenticator.authenticate(&options, "http://localhost:8080")?;
//! let credential = engine.finish_login("alice", &session.token(), &response).await?;
//! assert_eq!(credential.sign_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod base64url;
pub mod ceremony;
pub mod challenge;
pub mod clock;
pub mod cose;
pub mod credential;
pub mod error;
pub mod protocol;
pub mod relying_party;
pub mod repository;
pub mod verifier;

#[cfg(feature = "soft-authenticator")]
pub mod authenticator;

// Re-export main types for convenience
pub use attestation::{AttestationFormat, AttestationObject, AttestationType};
pub use ceremony::{CeremonyEngine, EngineConfig};
pub use challenge::{
    CeremonyKind, CeremonyState, Challenge, ChallengeStats, ChallengeStore, SessionData,
    CHALLENGE_LEN, DEFAULT_CHALLENGE_TTL_SECS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cose::{CoseAlgorithm, CosePublicKey, SUPPORTED_ALGORITHMS};
pub use credential::{
    AuthenticatorTransport, Credential, CredentialId, UserAccount, UserHandle,
    MAX_CREDENTIAL_ID_LEN, MAX_USER_HANDLE_LEN,
};
pub use error::{CeremonyError, Result};
pub use protocol::{
    AuthenticationResponse, PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
    RegistrationResponse, UserVerificationRequirement,
};
pub use relying_party::{RelyingParty, RelyingPartyError};
pub use repository::{CounterUpdate, CredentialRepository, MemoryRepository, RepositoryError};
pub use verifier::{verify_assertion, verify_attestation, AssertionOutcome};

#[cfg(feature = "soft-authenticator")]
pub use authenticator::{SoftAttestation, SoftAuthenticator};
