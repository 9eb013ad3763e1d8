//! WebAuthn Relying Party configuration
//!
//! Builds the Relying Party identity and ceremony policy from the environment.

use chrono::Duration;
use passkey_core::{
    EngineConfig, RelyingParty, RelyingPartyError, UserAccount, UserHandle,
    UserVerificationRequirement, DEFAULT_CHALLENGE_TTL_SECS,
};
use uuid::Uuid;

use crate::config::env_parse;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid relying party: {0}")]
    RelyingParty(#[from] RelyingPartyError),
    #[error("Invalid user verification requirement: {0}")]
    UserVerification(String),
    #[error("Invalid demo user entry: {0}")]
    DemoUser(String),
    #[error("Challenge TTL must be positive, got {0}s")]
    ChallengeTtl(i64),
}

/// A user provisioned at startup (the server has no sign-up flow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoUser {
    pub name: String,
    pub handle: String,
}

/// WebAuthn configuration
#[derive(Debug, Clone)]
pub struct WebAuthnConfig {
    pub rp_id: String,
    pub rp_name: String,
    pub rp_origins: Vec<String>,
    pub challenge_ttl_secs: i64,
    pub user_verification: UserVerificationRequirement,
    pub demo_users: Vec<DemoUser>,
}

impl Default for WebAuthnConfig {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Passkey Demo".to_string(),
            rp_origins: vec!["http://localhost:8080".to_string()],
            challenge_ttl_secs: DEFAULT_CHALLENGE_TTL_SECS,
            user_verification: UserVerificationRequirement::Preferred,
            demo_users: vec![DemoUser {
                name: "test".to_string(),
                handle: "1234567890".to_string(),
            }],
        }
    }
}

impl WebAuthnConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `WEBAUTHN_RP_ID` - Relying Party ID (default: "localhost")
    /// - `WEBAUTHN_RP_ORIGINS` - Comma-separated origins (default: "http://localhost:8080")
    /// - `WEBAUTHN_RP_NAME` - RP display name (default: "Passkey Demo")
    /// - `WEBAUTHN_CHALLENGE_TTL_SECS` - Challenge lifetime (default: 300)
    /// - `WEBAUTHN_USER_VERIFICATION` - required / preferred / discouraged
    /// - `DEMO_USERS` - Comma-separated `name[:handle]` entries (default: "test:1234567890")
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let rp_origins = std::env::var("WEBAUTHN_RP_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.rp_origins);

        let user_verification = match std::env::var("WEBAUTHN_USER_VERIFICATION") {
            Ok(v) => v.parse().map_err(ConfigError::UserVerification)?,
            Err(_) => defaults.user_verification,
        };

        let demo_users = match std::env::var("DEMO_USERS") {
            Ok(v) => parse_demo_users(&v)?,
            Err(_) => defaults.demo_users,
        };

        let config = Self {
            rp_id: std::env::var("WEBAUTHN_RP_ID").unwrap_or(defaults.rp_id),
            rp_name: std::env::var("WEBAUTHN_RP_NAME").unwrap_or(defaults.rp_name),
            rp_origins,
            challenge_ttl_secs: env_parse("WEBAUTHN_CHALLENGE_TTL_SECS")
                .unwrap_or(defaults.challenge_ttl_secs),
            user_verification,
            demo_users,
        };
        config.relying_party()?;
        config.engine_config()?;
        Ok(config)
    }

    /// Build the Relying Party identity
    pub fn relying_party(&self) -> Result<RelyingParty, ConfigError> {
        Ok(RelyingParty::new(
            self.rp_id.as_str(),
            self.rp_name.as_str(),
            &self.rp_origins,
        )?)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.challenge_ttl_secs <= 0 {
            return Err(ConfigError::ChallengeTtl(self.challenge_ttl_secs));
        }
        Ok(EngineConfig {
            challenge_ttl: Duration::seconds(self.challenge_ttl_secs),
            user_verification: self.user_verification,
        })
    }

    /// Accounts to provision before serving
    pub fn demo_accounts(&self) -> Result<Vec<UserAccount>, ConfigError> {
        self.demo_users
            .iter()
            .map(|user| {
                let handle = UserHandle::new(user.handle.as_bytes().to_vec())
                    .map_err(|e| ConfigError::DemoUser(format!("{}: {e}", user.name)))?;
                Ok(UserAccount::new(handle, user.name.as_str(), user.name.as_str()))
            })
            .collect()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `name[:handle]` entries; a missing handle gets a random UUID.
fn parse_demo_users(value: &str) -> Result<Vec<DemoUser>, ConfigError> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            let (name, handle) = match entry.split_once(':') {
                Some((name, handle)) => (name.trim(), handle.trim().to_string()),
                None => (entry.as_str(), Uuid::new_v4().to_string()),
            };
            if name.is_empty() || handle.is_empty() {
                return Err(ConfigError::DemoUser(entry.clone()));
            }
            Ok(DemoUser {
                name: name.to_string(),
                handle,
            })
        })
        .collect()
}
