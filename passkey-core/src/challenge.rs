//! Single-use, time-bounded ceremony challenges
//!
//! Each outstanding ceremony is keyed by its challenge value; the base64url
//! form of the challenge doubles as the session token handed to the client.
//! Consumed entries stay behind as tombstones so a replay is reported as
//! [`CeremonyError::AlreadyUsed`] instead of [`CeremonyError::NotFound`].
//!
//! Expiry is checked lazily in [`ChallengeStore::consume`]; the periodic
//! [`ChallengeStore::purge_expired`] only reclaims memory.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::base64url;
use crate::clock::{Clock, SystemClock};
use crate::credential::{CredentialId, UserHandle};
use crate::error::{CeremonyError, Result};
use crate::protocol::{UserVerificationRequirement, TYPE_CREATE, TYPE_GET};

/// Default challenge lifetime (5 minutes)
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// Challenge length in bytes
pub const CHALLENGE_LEN: usize = 32;

/// Which ceremony a challenge was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl CeremonyKind {
    /// `type` member the client data must carry for this ceremony.
    pub fn client_data_type(self) -> &'static str {
        match self {
            Self::Registration => TYPE_CREATE,
            Self::Authentication => TYPE_GET,
        }
    }
}

/// 32 random bytes from the OS CSPRNG
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    pub fn random() -> Self {
        let mut bytes = [0u8; CHALLENGE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }

    /// Session token handed to the client (base64url, no padding).
    pub fn to_token(&self) -> String {
        base64url::encode(&self.0)
    }

    /// Parse a session token. Anything that is not a 32-byte base64url value
    /// cannot have been issued here.
    pub fn from_token(token: &str) -> Result<Self> {
        let bytes = base64url::decode(token).map_err(|_| CeremonyError::NotFound("challenge"))?;
        let bytes: [u8; CHALLENGE_LEN] = bytes
            .try_into()
            .map_err(|_| CeremonyError::NotFound("challenge"))?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Challenge({})", self.to_token())
    }
}

/// Outstanding ceremony context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub challenge: Challenge,
    pub user_handle: UserHandle,
    pub kind: CeremonyKind,
    /// Credentials a login may use (empty for registration)
    pub allowed_credentials: Vec<CredentialId>,
    pub user_verification: UserVerificationRequirement,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn token(&self) -> String {
        self.challenge.to_token()
    }
}

/// Ceremony state machine: `Idle -> Begun -> Finished`, `Begun -> Expired`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    /// No ceremony known under this token
    Idle,
    Begun,
    Finished,
    Expired,
}

#[derive(Debug)]
struct ChallengeEntry {
    session: SessionData,
    consumed: bool,
}

/// Challenge store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChallengeStats {
    pub pending: usize,
    pub consumed: usize,
    pub expired: usize,
}

/// Concurrent challenge store
///
/// `consume` holds the entry's shard lock while it checks and marks the
/// entry, so of N racing finishers with the same challenge at most one wins.
pub struct ChallengeStore {
    entries: DashMap<Challenge, ChallengeEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ChallengeStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh challenge and record its session.
    pub fn issue(
        &self,
        kind: CeremonyKind,
        user_handle: UserHandle,
        allowed_credentials: Vec<CredentialId>,
        user_verification: UserVerificationRequirement,
    ) -> SessionData {
        let now = self.clock.now();
        let session = SessionData {
            challenge: Challenge::random(),
            user_handle,
            kind,
            allowed_credentials,
            user_verification,
            created_at: now,
            expires_at: now + self.ttl,
        };
        debug!(?kind, user = %session.user_handle, "Challenge issued");
        self.entries.insert(
            session.challenge,
            ChallengeEntry {
                session: session.clone(),
                consumed: false,
            },
        );
        session
    }

    /// Atomically mark the challenge used and return its session.
    ///
    /// A challenge issued for the other ceremony kind reports `NotFound` and
    /// is left untouched.
    pub fn consume(&self, challenge: &Challenge, kind: CeremonyKind) -> Result<SessionData> {
        let now = self.clock.now();
        let mut entry = self
            .entries
            .get_mut(challenge)
            .ok_or(CeremonyError::NotFound("challenge"))?;

        if entry.session.kind != kind {
            return Err(CeremonyError::NotFound("challenge"));
        }
        if entry.consumed {
            return Err(CeremonyError::AlreadyUsed);
        }
        if now >= entry.session.expires_at {
            return Err(CeremonyError::Expired);
        }

        entry.consumed = true;
        Ok(entry.session.clone())
    }

    pub fn status(&self, challenge: &Challenge) -> CeremonyState {
        let now = self.clock.now();
        match self.entries.get(challenge) {
            None => CeremonyState::Idle,
            Some(entry) if entry.consumed => CeremonyState::Finished,
            Some(entry) if now >= entry.session.expires_at => CeremonyState::Expired,
            Some(_) => CeremonyState::Begun,
        }
    }

    /// Drop entries one TTL past their expiry. Returns how many were removed.
    ///
    /// Until then an expired challenge keeps reporting `Expired` and a
    /// consumed one keeps reporting `AlreadyUsed`.
    pub fn purge_expired(&self) -> usize {
        let cutoff = self.clock.now() - self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.session.expires_at > cutoff);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged dead challenges");
        }
        removed
    }

    pub fn stats(&self) -> ChallengeStats {
        let now = self.clock.now();
        self.entries
            .iter()
            .fold(ChallengeStats::default(), |mut stats, entry| {
                if entry.consumed {
                    stats.consumed += 1;
                } else if now >= entry.session.expires_at {
                    stats.expired += 1;
                } else {
                    stats.pending += 1;
                }
                stats
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ChallengeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeStore")
            .field("entries", &self.entries.len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (ChallengeStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = ChallengeStore::with_clock(
            Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
            clock.clone(),
        );
        (store, clock)
    }

    fn user() -> UserHandle {
        UserHandle::new(b"1234567890".to_vec()).unwrap()
    }

    fn issue(store: &ChallengeStore, kind: CeremonyKind) -> SessionData {
        store.issue(kind, user(), Vec::new(), UserVerificationRequirement::Preferred)
    }

    #[test]
    fn test_token_roundtrip() {
        let challenge = Challenge::random();
        let token = challenge.to_token();
        assert_eq!(token.len(), 43);
        assert_eq!(Challenge::from_token(&token).unwrap(), challenge);
        assert_eq!(
            Challenge::from_token("AQID"),
            Err(CeremonyError::NotFound("challenge"))
        );
        assert_eq!(
            Challenge::from_token("not base64!"),
            Err(CeremonyError::NotFound("challenge"))
        );
    }

    #[test]
    fn test_challenges_are_unique() {
        let (store, _) = store();
        let a = issue(&store, CeremonyKind::Registration);
        let b = issue(&store, CeremonyKind::Registration);
        assert_ne!(a.challenge, b.challenge);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_consume_once() {
        let (store, _) = store();
        let session = issue(&store, CeremonyKind::Registration);
        assert_eq!(store.status(&session.challenge), CeremonyState::Begun);

        let consumed = store
            .consume(&session.challenge, CeremonyKind::Registration)
            .unwrap();
        assert_eq!(consumed, session);
        assert_eq!(store.status(&session.challenge), CeremonyState::Finished);
        assert_eq!(
            store.consume(&session.challenge, CeremonyKind::Registration),
            Err(CeremonyError::AlreadyUsed)
        );
    }

    #[test]
    fn test_unknown_challenge_not_found() {
        let (store, _) = store();
        assert_eq!(
            store.consume(&Challenge::random(), CeremonyKind::Authentication),
            Err(CeremonyError::NotFound("challenge"))
        );
        assert_eq!(store.status(&Challenge::random()), CeremonyState::Idle);
    }

    #[test]
    fn test_wrong_kind_leaves_entry_untouched() {
        let (store, _) = store();
        let session = issue(&store, CeremonyKind::Registration);
        assert_eq!(
            store.consume(&session.challenge, CeremonyKind::Authentication),
            Err(CeremonyError::NotFound("challenge"))
        );
        assert!(store
            .consume(&session.challenge, CeremonyKind::Registration)
            .is_ok());
    }

    #[test]
    fn test_expired_after_ttl() {
        let (store, clock) = store();
        let session = issue(&store, CeremonyKind::Authentication);
        clock.advance(Duration::minutes(6));
        assert_eq!(store.status(&session.challenge), CeremonyState::Expired);
        assert_eq!(
            store.consume(&session.challenge, CeremonyKind::Authentication),
            Err(CeremonyError::Expired)
        );
        // Still expired, not silently turned into NotFound
        assert_eq!(
            store.consume(&session.challenge, CeremonyKind::Authentication),
            Err(CeremonyError::Expired)
        );
    }

    #[test]
    fn test_purge_keeps_recent_tombstones() {
        let (store, clock) = store();
        let used = issue(&store, CeremonyKind::Registration);
        store
            .consume(&used.challenge, CeremonyKind::Registration)
            .unwrap();
        let _pending = issue(&store, CeremonyKind::Registration);

        clock.advance(Duration::minutes(6));
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(
            store.stats(),
            ChallengeStats {
                pending: 0,
                consumed: 1,
                expired: 1
            }
        );

        clock.advance(Duration::minutes(5));
        assert_eq!(store.purge_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        let (store, _) = store();
        let store = Arc::new(store);
        let session = issue(&store, CeremonyKind::Authentication);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let challenge = session.challenge;
                std::thread::spawn(move || {
                    store.consume(&challenge, CeremonyKind::Authentication)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == CeremonyError::AlreadyUsed));
    }
}
