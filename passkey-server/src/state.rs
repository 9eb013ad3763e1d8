//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use passkey_core::{CeremonyEngine, MemoryRepository};

use crate::webauthn::{ConfigError, WebAuthnConfig};

/// Engine type served by this binary
pub type Engine = CeremonyEngine<MemoryRepository>;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Ceremony engine shared by every request
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Build the engine and provision the configured demo users.
    pub fn from_config(config: &WebAuthnConfig) -> Result<Self, ConfigError> {
        let repository = MemoryRepository::new();
        for account in config.demo_accounts()? {
            repository
                .provision_user(account)
                .map_err(|e| ConfigError::DemoUser(e.to_string()))?;
        }
        let engine = CeremonyEngine::new(
            config.relying_party()?,
            repository,
            config.engine_config()?,
        );
        Ok(Self::new(engine))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .finish()
    }
}
