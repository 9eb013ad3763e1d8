//! WebAuthn HTTP surface
//!
//! ## Architecture
//!
//! - `config`: Relying Party identity and ceremony policy from the environment
//! - `handlers`: HTTP endpoint handlers for registration/login
//! - `types`: Request/response types for the WebAuthn API

mod config;
pub mod handlers;
mod types;

pub use config::{ConfigError, DemoUser, WebAuthnConfig};
pub use handlers::{finish_login, finish_registration, start_login, start_registration};
pub use types::{
    ErrorResponse, FinishLoginRequest, FinishLoginResponse, FinishRegistrationRequest,
    FinishRegistrationResponse, StartLoginResponse, StartRegistrationResponse, StartRequest,
};
