//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use passkey_core::CeremonyError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Ceremony error - a begin or finish step was rejected
    #[error("Ceremony error: {0}")]
    Ceremony(#[from] CeremonyError),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ceremony(ref e) => match e {
                CeremonyError::NotFound("user") => StatusCode::NOT_FOUND,

                CeremonyError::CredentialCollision => StatusCode::CONFLICT,

                CeremonyError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,

                // Well-formed but outside what this RP accepts → 422
                CeremonyError::UnsupportedFormat(_) | CeremonyError::UnsupportedAlgorithm(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }

                // Proof failures → 401
                CeremonyError::SignatureInvalid
                | CeremonyError::CounterRegression { .. }
                | CeremonyError::UserNotPresent
                | CeremonyError::UserNotVerified
                | CeremonyError::OriginMismatch(_)
                | CeremonyError::RpIdHashMismatch
                | CeremonyError::ChallengeMismatch
                | CeremonyError::UserMismatch
                | CeremonyError::NotFound("credential") => StatusCode::UNAUTHORIZED,

                // Stale or invalid session and malformed input → 400
                CeremonyError::Expired
                | CeremonyError::AlreadyUsed
                | CeremonyError::NotFound(_)
                | CeremonyError::NoCredentials
                | CeremonyError::WrongCeremonyType { .. }
                | CeremonyError::InvalidUserHandle(_)
                | CeremonyError::Malformed(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Ceremony(ref e) => e.code(),
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Ceremony(CeremonyError::Repository(_)) => {
                "Internal server error".to_string()
            }
            // Counter values stay in the logs
            Self::Ceremony(CeremonyError::CounterRegression { .. }) => {
                "Sign counter did not increase; the authenticator may be cloned".to_string()
            }
            Self::Ceremony(ref e) => e.to_string(),
            Self::BadRequest(_) => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Ceremony(_) => "ceremony",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
