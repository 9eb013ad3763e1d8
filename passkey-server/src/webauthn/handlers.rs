//! WebAuthn HTTP endpoint handlers
//!
//! Thin adapters from JSON bodies to the ceremony engine.

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::types::{
    ErrorResponse, FinishLoginRequest, FinishLoginResponse, FinishRegistrationRequest,
    FinishRegistrationResponse, StartLoginResponse, StartRegistrationResponse, StartRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/webauthn/register/start
///
/// Start registering a passkey for a provisioned user.
#[utoipa::path(
    post,
    path = "/api/webauthn/register/start",
    tag = "WebAuthn",
    request_body = StartRequest,
    responses(
        (status = 200, description = "Creation options issued", body = StartRegistrationResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "Stored credentials are inconsistent", body = ErrorResponse)
    )
)]
pub async fn start_registration(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartRegistrationResponse>, ApiError> {
    let Json(req) = payload?;
    let (public_key, session) = state.engine.begin_registration(&req.username).await?;

    Ok(Json(StartRegistrationResponse {
        session: session.token(),
        public_key,
    }))
}

/// POST /api/webauthn/register/finish
///
/// Verify the authenticator's attestation and store the credential.
#[utoipa::path(
    post,
    path = "/api/webauthn/register/finish",
    tag = "WebAuthn",
    request_body = FinishRegistrationRequest,
    responses(
        (status = 200, description = "Credential registered", body = FinishRegistrationResponse),
        (status = 400, description = "Unknown, expired or replayed session; malformed response", body = ErrorResponse),
        (status = 401, description = "Attestation did not verify", body = ErrorResponse),
        (status = 409, description = "Credential already registered", body = ErrorResponse),
        (status = 422, description = "Attestation format or algorithm not supported", body = ErrorResponse)
    )
)]
pub async fn finish_registration(
    State(state): State<AppState>,
    payload: Result<Json<FinishRegistrationRequest>, JsonRejection>,
) -> Result<Json<FinishRegistrationResponse>, ApiError> {
    let Json(req) = payload?;
    state
        .engine
        .finish_registration(&req.username, &req.session, &req.credential)
        .await?;

    Ok(Json(FinishRegistrationResponse { verified: true }))
}

/// POST /api/webauthn/login/start
///
/// Start a login for a user with at least one registered credential.
#[utoipa::path(
    post,
    path = "/api/webauthn/login/start",
    tag = "WebAuthn",
    request_body = StartRequest,
    responses(
        (status = 200, description = "Request options issued", body = StartLoginResponse),
        (status = 400, description = "User has no credentials", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse)
    )
)]
pub async fn start_login(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartLoginResponse>, ApiError> {
    let Json(req) = payload?;
    let (public_key, session) = state.engine.begin_login(&req.username).await?;

    Ok(Json(StartLoginResponse {
        session: session.token(),
        public_key,
    }))
}

/// POST /api/webauthn/login/finish
///
/// Verify the assertion and record the new sign counter.
#[utoipa::path(
    post,
    path = "/api/webauthn/login/finish",
    tag = "WebAuthn",
    request_body = FinishLoginRequest,
    responses(
        (status = 200, description = "Login verified", body = FinishLoginResponse),
        (status = 400, description = "Unknown, expired or replayed session; malformed response", body = ErrorResponse),
        (status = 401, description = "Assertion did not verify or counter regressed", body = ErrorResponse)
    )
)]
pub async fn finish_login(
    State(state): State<AppState>,
    payload: Result<Json<FinishLoginRequest>, JsonRejection>,
) -> Result<Json<FinishLoginResponse>, ApiError> {
    let Json(req) = payload?;
    let credential = state
        .engine
        .finish_login(&req.username, &req.session, &req.credential)
        .await?;

    Ok(Json(FinishLoginResponse {
        verified: true,
        counter: credential.sign_count,
    }))
}
