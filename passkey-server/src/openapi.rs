//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the passkey API.

use utoipa::OpenApi;

use crate::handlers::{HealthResponse, ReadyResponse};
use crate::webauthn::{
    ErrorResponse, FinishLoginRequest, FinishLoginResponse, FinishRegistrationRequest,
    FinishRegistrationResponse, StartLoginResponse, StartRegistrationResponse, StartRequest,
};

/// Passkey API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passkey Relying Party API",
        version = "0.1.0",
        description = r#"
## WebAuthn registration and login

Each ceremony is two calls:

1. **start** returns a `session` token and the options to pass to
   `navigator.credentials.create()` or `navigator.credentials.get()`
2. **finish** sends back the same `session` with `PublicKeyCredential.toJSON()`

A session token is single use and expires after the configured challenge TTL.
Failures carry a stable `code` such as `CHALLENGE_ALREADY_USED` or `ORIGIN_MISMATCH`.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "WebAuthn", description = "Passkey registration and login ceremonies"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::webauthn::handlers::start_registration,
        crate::webauthn::handlers::finish_registration,
        crate::webauthn::handlers::start_login,
        crate::webauthn::handlers::finish_login,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            StartRequest,
            StartRegistrationResponse,
            FinishRegistrationRequest,
            FinishRegistrationResponse,
            StartLoginResponse,
            FinishLoginRequest,
            FinishLoginResponse,
            ErrorResponse,
        )
    )
)]
pub struct ApiDoc;
