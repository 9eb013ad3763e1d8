//! Registration and authentication ceremonies
//!
//! [`CeremonyEngine`] drives both ceremonies from begin to finish:
//!
//! ```text
//! begin_*  : look up user -> issue challenge -> options + session token
//! finish_* : consume challenge -> check session owner -> verify -> store
//! ```
//!
//! Every failure is terminal for the attempt. The challenge is consumed
//! before anything else is checked, so a rejected response cannot be
//! retried with the same session token.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use crate::challenge::{
    CeremonyKind, CeremonyState, Challenge, ChallengeStats, ChallengeStore, SessionData,
    DEFAULT_CHALLENGE_TTL_SECS,
};
use crate::clock::{Clock, SystemClock};
use crate::cose::SUPPORTED_ALGORITHMS;
use crate::credential::{Credential, UserAccount, UserHandle};
use crate::error::{CeremonyError, Result};
use crate::protocol::{
    AuthenticationResponse, AuthenticatorSelectionCriteria, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters,
    PublicKeyCredentialRequestOptions, RegistrationResponse, RelyingPartyEntity, UserEntity,
    UserVerificationRequirement, PUBLIC_KEY_TYPE,
};
use crate::relying_party::RelyingParty;
use crate::repository::{CounterUpdate, CredentialRepository};
use crate::verifier::{verify_assertion, verify_attestation};

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long an issued challenge stays valid
    pub challenge_ttl: Duration,
    /// User verification policy requested and enforced for new ceremonies
    pub user_verification: UserVerificationRequirement,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
            user_verification: UserVerificationRequirement::Preferred,
        }
    }
}

/// WebAuthn ceremony engine
pub struct CeremonyEngine<R> {
    rp: RelyingParty,
    repository: R,
    challenges: ChallengeStore,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<R: CredentialRepository> CeremonyEngine<R> {
    pub fn new(rp: RelyingParty, repository: R, config: EngineConfig) -> Self {
        Self::with_clock(rp, repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        rp: RelyingParty,
        repository: R,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            challenges: ChallengeStore::with_clock(config.challenge_ttl, Arc::clone(&clock)),
            rp,
            repository,
            config,
            clock,
        }
    }

    pub fn relying_party(&self) -> &RelyingParty {
        &self.rp
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start registering a new credential for `user_name`.
    pub async fn begin_registration(
        &self,
        user_name: &str,
    ) -> Result<(PublicKeyCredentialCreationOptions, SessionData)> {
        let account = self.find_account(user_name).await?;
        check_user_handle(&account.handle)?;

        let mut seen = HashSet::new();
        if !account.credentials.iter().all(|c| seen.insert(&c.id)) {
            warn!(user = %user_name, "Stored credentials contain a duplicated identifier");
            return Err(CeremonyError::CredentialCollision);
        }

        let session = self.challenges.issue(
            CeremonyKind::Registration,
            account.handle.clone(),
            Vec::new(),
            self.config.user_verification,
        );

        let options = PublicKeyCredentialCreationOptions {
            rp: RelyingPartyEntity {
                id: self.rp.id().to_string(),
                name: self.rp.name().to_string(),
            },
            user: UserEntity {
                id: account.handle.to_string(),
                name: account.name.clone(),
                display_name: account.display_name.clone(),
            },
            challenge: session.token(),
            pub_key_cred_params: SUPPORTED_ALGORITHMS
                .iter()
                .map(|alg| PublicKeyCredentialParameters {
                    type_: PUBLIC_KEY_TYPE.to_string(),
                    alg: alg.id(),
                })
                .collect(),
            timeout: self.timeout_ms(),
            exclude_credentials: account
                .credentials
                .iter()
                .map(PublicKeyCredentialDescriptor::from)
                .collect(),
            authenticator_selection: AuthenticatorSelectionCriteria {
                resident_key: "preferred".to_string(),
                require_resident_key: false,
                user_verification: self.config.user_verification,
            },
            attestation: "none".to_string(),
        };

        info!(user = %user_name, "Registration ceremony started");
        Ok((options, session))
    }

    /// Verify a registration response and store the new credential.
    pub async fn finish_registration(
        &self,
        user_name: &str,
        session_token: &str,
        response: &RegistrationResponse,
    ) -> Result<Credential> {
        self.complete_registration(user_name, session_token, response)
            .await
            .inspect_err(|e| warn!(user = %user_name, code = e.code(), error = %e, "Registration rejected"))
    }

    async fn complete_registration(
        &self,
        user_name: &str,
        session_token: &str,
        response: &RegistrationResponse,
    ) -> Result<Credential> {
        let challenge = Challenge::from_token(session_token)?;
        let session = self
            .challenges
            .consume(&challenge, CeremonyKind::Registration)?;
        let account = self.find_account(user_name).await?;
        if account.handle != session.user_handle {
            return Err(CeremonyError::UserMismatch);
        }

        let response_id = response.credential_id()?;
        let mut credential = verify_attestation(
            &response.response.client_data_json,
            &response.response.attestation_object,
            session.challenge.as_bytes(),
            &self.rp,
            session.user_verification.is_required(),
            self.clock.now(),
        )?;
        if credential.id != response_id {
            return Err(CeremonyError::malformed(
                "credential ID in authenticator data differs from response id",
            ));
        }
        credential.transports = response.transports();

        if self.repository.credential_exists(&credential.id).await? {
            return Err(CeremonyError::CredentialCollision);
        }
        self.repository
            .append_credential(&account.handle, credential.clone())
            .await?;

        info!(
            user = %user_name,
            credential = %credential.id,
            alg = %credential.public_key.algorithm(),
            format = %credential.attestation_format,
            "Credential registered"
        );
        Ok(credential)
    }

    /// Start a login for `user_name`.
    ///
    /// Fails with `NoCredentials` before issuing a challenge when the user
    /// has nothing to log in with.
    pub async fn begin_login(
        &self,
        user_name: &str,
    ) -> Result<(PublicKeyCredentialRequestOptions, SessionData)> {
        let account = self.find_account(user_name).await?;
        check_user_handle(&account.handle)?;
        let credentials = self.repository.list_credentials(&account.handle).await?;
        if credentials.is_empty() {
            return Err(CeremonyError::NoCredentials);
        }

        let session = self.challenges.issue(
            CeremonyKind::Authentication,
            account.handle.clone(),
            credentials.iter().map(|c| c.id.clone()).collect(),
            self.config.user_verification,
        );

        let options = PublicKeyCredentialRequestOptions {
            challenge: session.token(),
            timeout: self.timeout_ms(),
            rp_id: self.rp.id().to_string(),
            allow_credentials: credentials
                .iter()
                .map(PublicKeyCredentialDescriptor::from)
                .collect(),
            user_verification: self.config.user_verification,
        };

        info!(user = %user_name, credentials = credentials.len(), "Login ceremony started");
        Ok((options, session))
    }

    /// Verify an assertion and raise the credential's sign counter.
    pub async fn finish_login(
        &self,
        user_name: &str,
        session_token: &str,
        response: &AuthenticationResponse,
    ) -> Result<Credential> {
        self.complete_login(user_name, session_token, response)
            .await
            .inspect_err(|e| warn!(user = %user_name, code = e.code(), error = %e, "Login rejected"))
    }

    async fn complete_login(
        &self,
        user_name: &str,
        session_token: &str,
        response: &AuthenticationResponse,
    ) -> Result<Credential> {
        let challenge = Challenge::from_token(session_token)?;
        let session = self
            .challenges
            .consume(&challenge, CeremonyKind::Authentication)?;
        let account = self.find_account(user_name).await?;
        if account.handle != session.user_handle {
            return Err(CeremonyError::UserMismatch);
        }

        let credential_id = response.credential_id()?;
        if !Credential::matches_allowed_list(&credential_id, &session.allowed_credentials) {
            return Err(CeremonyError::NotFound("credential"));
        }
        if let Some(user_handle) = &response.response.user_handle {
            if user_handle.as_slice() != account.handle.as_bytes() {
                return Err(CeremonyError::UserMismatch);
            }
        }

        let stored = self
            .repository
            .lookup_credential(&account.handle, &credential_id)
            .await?;
        let outcome = verify_assertion(
            &response.response.client_data_json,
            &response.response.authenticator_data,
            &response.response.signature,
            &stored,
            session.challenge.as_bytes(),
            &self.rp,
            session.user_verification.is_required(),
        )?;

        let updated = self
            .repository
            .update_counter(
                &account.handle,
                &credential_id,
                CounterUpdate {
                    sign_count: outcome.sign_count,
                    backup_state: outcome.backup_state,
                    used_at: self.clock.now(),
                },
            )
            .await?;

        info!(
            user = %user_name,
            credential = %credential_id,
            counter = updated.sign_count,
            user_verified = outcome.user_verified,
            "Login verified"
        );
        Ok(updated)
    }

    /// Where the ceremony behind `session_token` stands.
    pub fn ceremony_state(&self, session_token: &str) -> CeremonyState {
        match Challenge::from_token(session_token) {
            Ok(challenge) => self.challenges.status(&challenge),
            Err(_) => CeremonyState::Idle,
        }
    }

    /// Reclaim memory held by dead challenges.
    pub fn purge_expired(&self) -> usize {
        self.challenges.purge_expired()
    }

    pub fn challenge_stats(&self) -> ChallengeStats {
        self.challenges.stats()
    }

    async fn find_account(&self, user_name: &str) -> Result<UserAccount> {
        self.repository
            .find_user(user_name)
            .await?
            .ok_or(CeremonyError::NotFound("user"))
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.challenge_ttl.num_milliseconds()).unwrap_or(0)
    }
}

impl<R> std::fmt::Debug for CeremonyEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CeremonyEngine")
            .field("rp_id", &self.rp.id())
            .field("challenges", &self.challenges)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Handles arriving from storage did not necessarily pass through
/// [`UserHandle::new`].
fn check_user_handle(handle: &UserHandle) -> Result<()> {
    UserHandle::new(handle.as_bytes().to_vec()).map(|_| ())
}
