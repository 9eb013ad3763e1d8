//! WebAuthn request/response types
//!
//! Defines the data structures for WebAuthn API communication.

use passkey_core::{
    AuthenticationResponse, PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
    RegistrationResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to start a registration or login ceremony
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartRequest {
    /// Provisioned user name
    #[schema(example = "test")]
    pub username: String,
}

/// Response containing the registration challenge
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartRegistrationResponse {
    /// Session token to echo back on finish
    #[schema(example = "q2sB6K0TfZ3gQ8Y1p1m5rS7vEw9uJX4cT0aLdH2yNkI")]
    pub session: String,
    /// Options for navigator.credentials.create
    #[schema(value_type = Object)]
    pub public_key: PublicKeyCredentialCreationOptions,
}

/// Request to complete a registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinishRegistrationRequest {
    #[schema(example = "test")]
    pub username: String,
    /// Session token from register/start
    pub session: String,
    /// `PublicKeyCredential.toJSON()` from navigator.credentials.create
    #[schema(value_type = Object)]
    pub credential: RegistrationResponse,
}

/// Registration outcome
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinishRegistrationResponse {
    #[schema(example = true)]
    pub verified: bool,
}

/// Response containing the login challenge
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartLoginResponse {
    /// Session token to echo back on finish
    #[schema(example = "q2sB6K0TfZ3gQ8Y1p1m5rS7vEw9uJX4cT0aLdH2yNkI")]
    pub session: String,
    /// Options for navigator.credentials.get
    #[schema(value_type = Object)]
    pub public_key: PublicKeyCredentialRequestOptions,
}

/// Request to complete a login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinishLoginRequest {
    #[schema(example = "test")]
    pub username: String,
    /// Session token from login/start
    pub session: String,
    /// `PublicKeyCredential.toJSON()` from navigator.credentials.get
    #[schema(value_type = Object)]
    pub credential: AuthenticationResponse,
}

/// Login outcome
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinishLoginResponse {
    #[schema(example = true)]
    pub verified: bool,
    /// Sign counter recorded for the credential
    #[schema(example = 42)]
    pub counter: u32,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Challenge already used")]
    pub error: String,
    #[schema(example = "CHALLENGE_ALREADY_USED")]
    pub code: String,
}
