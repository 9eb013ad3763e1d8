//! User/credential storage contract
//!
//! The ceremony engine reads accounts and credentials through
//! [`CredentialRepository`] and only ever appends credentials or raises their
//! sign counters. Account provisioning happens outside the engine.

mod memory;

pub use memory::MemoryRepository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credential::{Credential, CredentialId, UserAccount, UserHandle};
use crate::error::CeremonyError;

/// Storage errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("User not found")]
    UserNotFound,

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Credential already registered")]
    DuplicateCredential,

    #[error("Counter update rejected: stored={stored}, reported={reported}")]
    CounterRegression { stored: u32, reported: u32 },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<RepositoryError> for CeremonyError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserNotFound => CeremonyError::NotFound("user"),
            RepositoryError::CredentialNotFound => CeremonyError::NotFound("credential"),
            RepositoryError::DuplicateCredential => CeremonyError::CredentialCollision,
            RepositoryError::CounterRegression { stored, reported } => {
                CeremonyError::CounterRegression { stored, reported }
            }
            other @ (RepositoryError::UserExists(_) | RepositoryError::Backend(_)) => {
                CeremonyError::Repository(other.to_string())
            }
        }
    }
}

/// State written back after a successful login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    pub sign_count: u32,
    pub backup_state: bool,
    pub used_at: DateTime<Utc>,
}

/// Storage contract used by the ceremony engine.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Look up an account by its human-readable name.
    async fn find_user(&self, name: &str) -> Result<Option<UserAccount>, RepositoryError>;

    async fn lookup_credential(
        &self,
        user: &UserHandle,
        id: &CredentialId,
    ) -> Result<Credential, RepositoryError>;

    async fn list_credentials(&self, user: &UserHandle) -> Result<Vec<Credential>, RepositoryError>;

    /// Whether `id` is registered to any user.
    async fn credential_exists(&self, id: &CredentialId) -> Result<bool, RepositoryError>;

    /// Attach a new credential. Fails with `DuplicateCredential` if the ID is
    /// already registered anywhere.
    async fn append_credential(
        &self,
        user: &UserHandle,
        credential: Credential,
    ) -> Result<(), RepositoryError>;

    /// Compare-and-set the sign counter.
    ///
    /// Applies the same rule as [`Credential::verify_counter`] against the
    /// currently stored value, so concurrent logins cannot move a counter
    /// backwards. Returns the updated credential.
    async fn update_counter(
        &self,
        user: &UserHandle,
        id: &CredentialId,
        update: CounterUpdate,
    ) -> Result<Credential, RepositoryError>;
}

#[async_trait]
impl<R: CredentialRepository + ?Sized> CredentialRepository for Arc<R> {
    async fn find_user(&self, name: &str) -> Result<Option<UserAccount>, RepositoryError> {
        (**self).find_user(name).await
    }

    async fn lookup_credential(
        &self,
        user: &UserHandle,
        id: &CredentialId,
    ) -> Result<Credential, RepositoryError> {
        (**self).lookup_credential(user, id).await
    }

    async fn list_credentials(&self, user: &UserHandle) -> Result<Vec<Credential>, RepositoryError> {
        (**self).list_credentials(user).await
    }

    async fn credential_exists(&self, id: &CredentialId) -> Result<bool, RepositoryError> {
        (**self).credential_exists(id).await
    }

    async fn append_credential(
        &self,
        user: &UserHandle,
        credential: Credential,
    ) -> Result<(), RepositoryError> {
        (**self).append_credential(user, credential).await
    }

    async fn update_counter(
        &self,
        user: &UserHandle,
        id: &CredentialId,
        update: CounterUpdate,
    ) -> Result<Credential, RepositoryError> {
        (**self).update_counter(user, id, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            CeremonyError::from(RepositoryError::UserNotFound),
            CeremonyError::NotFound("user")
        );
        assert_eq!(
            CeremonyError::from(RepositoryError::DuplicateCredential),
            CeremonyError::CredentialCollision
        );
        assert!(CeremonyError::from(RepositoryError::Backend("disk full".into())).is_internal());
    }
}
