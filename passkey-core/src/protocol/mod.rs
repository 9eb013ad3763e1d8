//! WebAuthn wire formats
//!
//! - `authenticator_data`: binary authenticator data parser
//! - `client_data`: `clientDataJSON` model and hashing
//! - `options`: creation/request options sent to the client
//! - `response`: registration/assertion responses sent back by the client

pub mod authenticator_data;
pub mod client_data;
pub mod options;
pub mod response;

pub use authenticator_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use client_data::{ClientData, CollectedClientData, TYPE_CREATE, TYPE_GET};
pub use options::{
    AuthenticatorSelectionCriteria, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialDescriptor, PublicKeyCredentialParameters,
    PublicKeyCredentialRequestOptions, RelyingPartyEntity, UserEntity,
    UserVerificationRequirement, PUBLIC_KEY_TYPE,
};
pub use response::{
    AuthenticationResponse, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    RegistrationResponse,
};
