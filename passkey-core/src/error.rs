use thiserror::Error;

/// Failure classification for a registration or authentication ceremony.
///
/// Every variant is terminal for the current attempt: the engine never retries
/// internally and never leaves a partial mutation behind. Callers start a new
/// ceremony (and therefore get a new challenge) to try again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    #[error("Challenge in client data does not match the issued challenge")]
    ChallengeMismatch,

    #[error("Origin not accepted by this relying party: {0}")]
    OriginMismatch(String),

    #[error("Relying party ID hash in authenticator data does not match")]
    RpIdHashMismatch,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Sign counter regression: stored={stored}, reported={reported}")]
    CounterRegression { stored: u32, reported: u32 },

    #[error("Challenge expired")]
    Expired,

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Challenge already used")]
    AlreadyUsed,

    #[error("User presence flag not set")]
    UserNotPresent,

    #[error("User verification required but not performed")]
    UserNotVerified,

    #[error("Unsupported attestation format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported COSE algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("User has no registered credentials")]
    NoCredentials,

    #[error("Unexpected client data type: expected={expected}, found={found}")]
    WrongCeremonyType { expected: &'static str, found: String },

    #[error("Ceremony was started for a different user")]
    UserMismatch,

    #[error("Credential identifier already registered")]
    CredentialCollision,

    #[error("Invalid user handle length: {0} bytes (1..=64 allowed)")]
    InvalidUserHandle(usize),

    #[error("Malformed ceremony data: {0}")]
    Malformed(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl CeremonyError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed(detail.into())
    }

    /// Stable machine-readable code, surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ChallengeMismatch => "CHALLENGE_MISMATCH",
            Self::OriginMismatch(_) => "ORIGIN_MISMATCH",
            Self::RpIdHashMismatch => "RPID_HASH_MISMATCH",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::CounterRegression { .. } => "COUNTER_REGRESSION",
            Self::Expired => "CHALLENGE_EXPIRED",
            Self::NotFound("challenge") => "CHALLENGE_NOT_FOUND",
            Self::NotFound("user") => "USER_NOT_FOUND",
            Self::NotFound(_) => "CREDENTIAL_NOT_FOUND",
            Self::AlreadyUsed => "CHALLENGE_ALREADY_USED",
            Self::UserNotPresent => "USER_NOT_PRESENT",
            Self::UserNotVerified => "USER_NOT_VERIFIED",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::UnsupportedAlgorithm(_) => "UNSUPPORTED_ALGORITHM",
            Self::NoCredentials => "NO_CREDENTIALS",
            Self::WrongCeremonyType { .. } => "WRONG_CEREMONY_TYPE",
            Self::UserMismatch => "USER_MISMATCH",
            Self::CredentialCollision => "CREDENTIAL_COLLISION",
            Self::InvalidUserHandle(_) => "INVALID_USER_HANDLE",
            Self::Malformed(_) => "MALFORMED_RESPONSE",
            Self::Repository(_) => "REPOSITORY_ERROR",
        }
    }

    /// Whether the failure was caused by the storage collaborator rather than
    /// by the client's ceremony data.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

pub type Result<T> = std::result::Result<T, CeremonyError>;
