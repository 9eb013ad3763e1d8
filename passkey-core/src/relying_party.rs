//! Relying Party identity
//!
//! The RP is identified by a domain (the RP ID) and accepts ceremonies from a
//! fixed set of origins. Every accepted origin's host must be the RP ID itself
//! or a subdomain of it.

use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Relying Party configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelyingPartyError {
    #[error("Invalid RP ID: {0}")]
    InvalidId(String),
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),
    #[error("Origin {origin} is not within RP ID {rp_id}")]
    OriginOutsideRpId { origin: String, rp_id: String },
    #[error("At least one accepted origin is required")]
    NoOrigins,
}

/// Immutable Relying Party identity, built once at startup.
#[derive(Debug, Clone)]
pub struct RelyingParty {
    id: String,
    name: String,
    origins: Vec<String>,
    id_hash: [u8; 32],
}

impl RelyingParty {
    /// Create a Relying Party
    ///
    /// # Arguments
    ///
    /// * `id` - RP ID (a bare domain such as `example.com` or `localhost`)
    /// * `name` - Human-readable display name
    /// * `origins` - Accepted origin URLs (`https://login.example.com`)
    pub fn new<I, S>(
        id: impl Into<String>,
        name: impl Into<String>,
        origins: I,
    ) -> Result<Self, RelyingPartyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = id.into().to_ascii_lowercase();
        validate_rp_id(&id)?;

        let mut normalised = Vec::new();
        for origin in origins {
            let origin = origin.as_ref();
            let url = Url::parse(origin)
                .map_err(|e| RelyingPartyError::InvalidOrigin(format!("{origin}: {e}")))?;
            let host = url
                .host_str()
                .ok_or_else(|| RelyingPartyError::InvalidOrigin(origin.to_string()))?;
            if !matches!(url.scheme(), "https" | "http") {
                return Err(RelyingPartyError::InvalidOrigin(origin.to_string()));
            }
            if !is_domain_suffix(host, &id) {
                return Err(RelyingPartyError::OriginOutsideRpId {
                    origin: origin.to_string(),
                    rp_id: id,
                });
            }
            let serialized = url.origin().ascii_serialization();
            if !normalised.contains(&serialized) {
                normalised.push(serialized);
            }
        }

        if normalised.is_empty() {
            return Err(RelyingPartyError::NoOrigins);
        }

        let id_hash = Sha256::digest(id.as_bytes()).into();

        Ok(Self {
            id,
            name: name.into(),
            origins: normalised,
            id_hash,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// SHA-256 of the RP ID, as embedded in authenticator data.
    pub fn id_hash(&self) -> &[u8; 32] {
        &self.id_hash
    }

    /// Check a client-reported origin against the accepted set.
    pub fn accepts_origin(&self, origin: &str) -> bool {
        match Url::parse(origin) {
            Ok(url) => {
                let serialized = url.origin().ascii_serialization();
                // Reject anything that is not already a bare origin.
                serialized == origin.trim_end_matches('/')
                    && self.origins.iter().any(|o| *o == serialized)
            }
            Err(_) => false,
        }
    }
}

fn validate_rp_id(id: &str) -> Result<(), RelyingPartyError> {
    if id.is_empty() || id.len() > 253 {
        return Err(RelyingPartyError::InvalidId(id.to_string()));
    }
    let labels_ok = id.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return Err(RelyingPartyError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn is_domain_suffix(host: &str, rp_id: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == rp_id
        || host
            .strip_suffix(rp_id)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_rp() {
        let rp = RelyingParty::new("localhost", "Passkey Demo", ["http://localhost:8080"]).unwrap();
        assert_eq!(rp.id(), "localhost");
        assert_eq!(rp.origins(), ["http://localhost:8080"]);
        assert!(rp.accepts_origin("http://localhost:8080"));
        assert!(!rp.accepts_origin("http://localhost:8081"));
        assert!(!rp.accepts_origin("https://localhost:8080"));
    }

    #[test]
    fn test_subdomain_origins_accepted() {
        let rp = RelyingParty::new(
            "example.com",
            "Example",
            ["https://example.com", "https://login.example.com/"],
        )
        .unwrap();
        assert_eq!(
            rp.origins(),
            ["https://example.com", "https://login.example.com"]
        );
        assert!(rp.accepts_origin("https://login.example.com"));
    }

    #[test]
    fn test_origin_outside_rp_id_rejected() {
        let err = RelyingParty::new("example.com", "Example", ["https://notexample.com"]);
        assert!(matches!(
            err,
            Err(RelyingPartyError::OriginOutsideRpId { .. })
        ));

        let err = RelyingParty::new("example.com", "Example", ["https://example.com.evil.io"]);
        assert!(matches!(
            err,
            Err(RelyingPartyError::OriginOutsideRpId { .. })
        ));
    }

    #[test]
    fn test_invalid_rp_id_rejected() {
        assert!(RelyingParty::new("https://example.com", "x", ["https://example.com"]).is_err());
        assert!(RelyingParty::new("", "x", ["https://example.com"]).is_err());
        assert!(RelyingParty::new("example..com", "x", ["https://example.com"]).is_err());
    }

    #[test]
    fn test_no_origins_rejected() {
        let origins: [&str; 0] = [];
        assert_eq!(
            RelyingParty::new("example.com", "x", origins).unwrap_err(),
            RelyingPartyError::NoOrigins
        );
    }

    #[test]
    fn test_origin_with_path_not_accepted() {
        let rp = RelyingParty::new("example.com", "x", ["https://example.com"]).unwrap();
        assert!(!rp.accepts_origin("https://example.com/login"));
        assert!(!rp.accepts_origin("not a url"));
    }

    #[test]
    fn test_id_hash_is_sha256_of_id() {
        let rp = RelyingParty::new("localhost", "x", ["http://localhost:8080"]).unwrap();
        let expected: [u8; 32] = Sha256::digest(b"localhost").into();
        assert_eq!(rp.id_hash(), &expected);
    }
}
