//! Pending invites kept in user metadata under `pending_invites`.
//!
//! Entries are keyed by the SHA-256 of the token. Reads and writes for one
//! user are serialized, so consuming a token succeeds at most once. A user's
//! lock lives only while someone holds or waits on it.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::metadata::MetadataStore;
use crate::models::PendingInvite;
use crate::services::ServiceError;
use crate::utils::hash_token;

const PENDING_INVITES_KEY: &str = "pending_invites";

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Held lock for one user. Dropping it removes the map entry when no other
/// task holds a handle.
struct UserLock<'a> {
    locks: &'a LockMap,
    user_id: &'a str,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct MetadataInviteStore {
    store: Arc<dyn MetadataStore>,
    locks: LockMap,
}

impl MetadataInviteStore {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    async fn lock_user<'a>(&'a self, user_id: &'a str) -> UserLock<'a> {
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        UserLock {
            locks: &self.locks,
            user_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn pending(&self, user_id: &str) -> Result<Map<String, Value>, ServiceError> {
        let metadata = self.store.get(user_id).await?;
        Ok(metadata
            .get(PENDING_INVITES_KEY)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(&self, user_id: &str, pending: Map<String, Value>) -> Result<(), ServiceError> {
        let mut update = Map::new();
        update.insert(PENDING_INVITES_KEY.to_string(), Value::Object(pending));
        self.store.merge(user_id, update).await?;
        Ok(())
    }

    pub async fn add(
        &self,
        user_id: &str,
        token: &str,
        invite: &PendingInvite,
    ) -> Result<(), ServiceError> {
        let _lock = self.lock_user(user_id).await;

        let mut pending = self.pending(user_id).await?;
        pending.insert(hash_token(token), serde_json::to_value(invite)?);
        self.write(user_id, pending).await
    }

    pub async fn consume(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Option<PendingInvite>, ServiceError> {
        let _lock = self.lock_user(user_id).await;

        let mut pending = self.pending(user_id).await?;
        let Some(raw) = pending.remove(&hash_token(token)) else {
            return Ok(None);
        };
        self.write(user_id, pending).await?;

        Ok(Some(serde_json::from_value(raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryMetadataStore;

    #[tokio::test]
    async fn test_consume_returns_invite_once() {
        let invites = MetadataInviteStore::new(Arc::new(InMemoryMetadataStore::new()));
        let invite = PendingInvite::new("t-1", "viewer", "u-admin");
        invites.add("u-1", "tok", &invite).await.unwrap();

        assert_eq!(invites.consume("u-1", "tok").await.unwrap(), Some(invite));
        assert_eq!(invites.consume("u-1", "tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_get_one_invite() {
        let invites = Arc::new(MetadataInviteStore::new(Arc::new(
            InMemoryMetadataStore::new(),
        )));
        invites
            .add("u-1", "tok", &PendingInvite::new("t-1", "viewer", "u-admin"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let invites = invites.clone();
                tokio::spawn(async move { invites.consume("u-1", "tok").await.unwrap() })
            })
            .collect();

        let mut consumed = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                consumed += 1;
            }
        }
        assert_eq!(consumed, 1);
        assert!(invites.locks.is_empty());
    }

    #[tokio::test]
    async fn test_user_locks_are_dropped_after_use() {
        let invites = MetadataInviteStore::new(Arc::new(InMemoryMetadataStore::new()));
        for user in ["u-1", "u-2", "u-3"] {
            invites
                .add(user, "tok", &PendingInvite::new("t-1", "viewer", "u-admin"))
                .await
                .unwrap();
            invites.consume(user, "tok").await.unwrap();
        }
        invites.consume("u-4", "missing").await.unwrap();

        assert!(invites.locks.is_empty());
    }

    #[tokio::test]
    async fn test_raw_token_is_not_stored() {
        let store = Arc::new(InMemoryMetadataStore::new());
        let invites = MetadataInviteStore::new(store.clone());
        invites
            .add("u-1", "secret-token", &PendingInvite::new("t-1", "viewer", "u-admin"))
            .await
            .unwrap();

        let raw = serde_json::to_string(&store.get("u-1").await.unwrap()).unwrap();
        assert!(!raw.contains("secret-token"));
        assert!(raw.contains(&hash_token("secret-token")));
    }

    #[tokio::test]
    async fn test_invites_for_other_tokens_survive() {
        let invites = MetadataInviteStore::new(Arc::new(InMemoryMetadataStore::new()));
        invites
            .add("u-1", "a", &PendingInvite::new("t-1", "viewer", "u-admin"))
            .await
            .unwrap();
        invites
            .add("u-1", "b", &PendingInvite::new("t-2", "editor", "u-admin"))
            .await
            .unwrap();

        invites.consume("u-1", "a").await.unwrap();
        let other = invites.consume("u-1", "b").await.unwrap().unwrap();
        assert_eq!(other.tenant_id, "t-2");
    }
}
