//! Revoked-signature storage interface.
//!
//! A revocation record is `{signature, expires_at}`. It is created once, on
//! logout, and never updated. `expires_at` is the revoked token's own `exp`,
//! so once it has passed the record carries no information: the codec would
//! reject the token on expiry alone.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::auth::error::AuthError;

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `signature` as revoked until `expires_at`.
    ///
    /// # Errors
    ///
    /// [`AuthError::AlreadyRevoked`] when a record for `signature` exists.
    /// Implementations must detect this atomically (uniqueness constraint),
    /// never by reading first, so concurrent logouts of the same token yield
    /// exactly one success.
    async fn blacklist(&self, signature: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Exact-key lookup. Absence is `Ok(false)`, not an error.
    async fn is_blacklisted(&self, signature: &str) -> Result<bool, AuthError>;

    /// Delete records whose `expires_at` is strictly before `now`. Returns the
    /// number of records removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Map-backed store for tests and single-process experiments.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    records: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Stored expiry for `signature`, if revoked.
    pub async fn expiry_of(&self, signature: &str) -> Option<DateTime<Utc>> {
        self.records.read().await.get(signature).copied()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn blacklist(&self, signature: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        match self.records.write().await.entry(signature.to_string()) {
            Entry::Occupied(_) => Err(AuthError::AlreadyRevoked),
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                Ok(())
            }
        }
    }

    async fn is_blacklisted(&self, signature: &str) -> Result<bool, AuthError> {
        Ok(self.records.read().await.contains_key(signature))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, expires_at| *expires_at >= now);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[tokio::test]
    async fn blacklisted_signature_is_found() {
        let store = MemoryRevocationStore::new();
        let exp = Utc::now() + Duration::minutes(5);

        assert!(!store.is_blacklisted("sig").await.unwrap());
        store.blacklist("sig", exp).await.unwrap();
        assert!(store.is_blacklisted("sig").await.unwrap());
        assert_eq!(store.expiry_of("sig").await, Some(exp));
    }

    #[tokio::test]
    async fn second_blacklist_is_a_conflict_and_keeps_first_expiry() {
        let store = MemoryRevocationStore::new();
        let first = Utc::now() + Duration::minutes(5);
        let second = first + Duration::hours(1);

        store.blacklist("sig", first).await.unwrap();
        let err = store.blacklist("sig", second).await.unwrap_err();

        assert!(matches!(err, AuthError::AlreadyRevoked));
        assert_eq!(store.expiry_of("sig").await, Some(first));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_is_exact_not_prefix() {
        let store = MemoryRevocationStore::new();
        store.blacklist("abcdef", Utc::now()).await.unwrap();

        assert!(!store.is_blacklisted("abc").await.unwrap());
        assert!(!store.is_blacklisted("abcdefg").await.unwrap());
        assert!(!store.is_blacklisted("").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_revocations_of_one_signature_have_one_winner() {
        let store = Arc::new(MemoryRevocationStore::new());
        let exp = Utc::now() + Duration::minutes(5);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.blacklist("race", exp).await })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => wins += 1,
                Err(AuthError::AlreadyRevoked) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn purge_removes_only_past_records() {
        let store = MemoryRevocationStore::new();
        let now = Utc::now();
        store.blacklist("old", now - Duration::seconds(1)).await.unwrap();
        store.blacklist("fresh", now + Duration::minutes(5)).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert!(!store.is_blacklisted("old").await.unwrap());
        assert!(store.is_blacklisted("fresh").await.unwrap());
        assert!(!store.is_empty().await);
    }

    proptest! {
        #[test]
        fn only_recorded_signatures_are_blacklisted(
            recorded in proptest::collection::hash_set("[A-Za-z0-9_-]{1,43}", 1..20),
            probe in "[A-Za-z0-9_-]{1,43}",
        ) {
            let store = MemoryRevocationStore::new();
            let exp = Utc::now() + Duration::minutes(5);
            tokio_test::block_on(async {
                for sig in &recorded {
                    store.blacklist(sig, exp).await.unwrap();
                }
            });
            let found = tokio_test::block_on(store.is_blacklisted(&probe)).unwrap();
            prop_assert_eq!(found, recorded.contains(&probe));
        }
    }
}
