//! In-memory repository
//!
//! Accounts are lost on restart. Suitable for the demo server and tests.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CounterUpdate, CredentialRepository, RepositoryError};
use crate::credential::{Credential, CredentialId, UserAccount, UserHandle};

/// DashMap-backed repository
#[derive(Default)]
pub struct MemoryRepository {
    users: DashMap<UserHandle, UserAccount>,
    /// name -> handle
    names: DashMap<String, UserHandle>,
    /// credential ID -> owning user, for global uniqueness
    credential_index: DashMap<CredentialId, UserHandle>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision an account (external to the ceremony engine).
    pub fn provision_user(&self, account: UserAccount) -> Result<(), RepositoryError> {
        let name_slot = match self.names.entry(account.name.clone()) {
            Entry::Occupied(_) => return Err(RepositoryError::UserExists(account.name)),
            Entry::Vacant(slot) => slot,
        };
        let user_slot = match self.users.entry(account.handle.clone()) {
            Entry::Occupied(_) => return Err(RepositoryError::UserExists(account.name)),
            Entry::Vacant(slot) => slot,
        };
        for credential in &account.credentials {
            if let Some(owner) = self.credential_index.get(&credential.id) {
                if *owner != account.handle {
                    return Err(RepositoryError::DuplicateCredential);
                }
            }
        }

        for credential in &account.credentials {
            self.credential_index
                .insert(credential.id.clone(), account.handle.clone());
        }
        name_slot.insert(account.handle.clone());
        tracing::info!(user = %account.name, "User provisioned");
        user_slot.insert(account);
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn credential_count(&self) -> usize {
        self.credential_index.len()
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("users", &self.users.len())
            .field("credentials", &self.credential_index.len())
            .finish()
    }
}

#[async_trait]
impl CredentialRepository for MemoryRepository {
    async fn find_user(&self, name: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let Some(handle) = self.names.get(name).map(|h| h.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&handle).map(|account| account.clone()))
    }

    async fn lookup_credential(
        &self,
        user: &UserHandle,
        id: &CredentialId,
    ) -> Result<Credential, RepositoryError> {
        let account = self.users.get(user).ok_or(RepositoryError::UserNotFound)?;
        account
            .find_credential(id)
            .cloned()
            .ok_or(RepositoryError::CredentialNotFound)
    }

    async fn list_credentials(&self, user: &UserHandle) -> Result<Vec<Credential>, RepositoryError> {
        let account = self.users.get(user).ok_or(RepositoryError::UserNotFound)?;
        Ok(account.credentials.clone())
    }

    async fn credential_exists(&self, id: &CredentialId) -> Result<bool, RepositoryError> {
        Ok(self.credential_index.contains_key(id))
    }

    async fn append_credential(
        &self,
        user: &UserHandle,
        credential: Credential,
    ) -> Result<(), RepositoryError> {
        let mut account = self
            .users
            .get_mut(user)
            .ok_or(RepositoryError::UserNotFound)?;
        match self.credential_index.entry(credential.id.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateCredential),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                account.credentials.push(credential);
                Ok(())
            }
        }
    }

    async fn update_counter(
        &self,
        user: &UserHandle,
        id: &CredentialId,
        update: CounterUpdate,
    ) -> Result<Credential, RepositoryError> {
        let mut account = self
            .users
            .get_mut(user)
            .ok_or(RepositoryError::UserNotFound)?;
        let credential = account
            .credentials
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or(RepositoryError::CredentialNotFound)?;

        if !credential.verify_counter(update.sign_count) {
            return Err(RepositoryError::CounterRegression {
                stored: credential.sign_count,
                reported: update.sign_count,
            });
        }

        credential.sign_count = update.sign_count;
        credential.backup_state = update.backup_state;
        credential.last_used_at = Some(update.used_at);
        Ok(credential.clone())
    }
}
