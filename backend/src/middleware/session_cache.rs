//! Recently loaded accounts, keyed by id
//!
//! The session middleware re-reads an account's status and stored role on
//! every request; this cache bounds how often that reaches the database.

use shared::models::Account;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct CachedAccount {
    account: Account,
    loaded_at: Instant,
}

/// Account records with a fixed time-to-live
#[derive(Debug)]
pub struct SessionCache {
    inner: RwLock<HashMap<Uuid, CachedAccount>>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached account, unless it is older than the TTL
    pub async fn get(&self, account_id: Uuid) -> Option<Account> {
        // Write lock so stale entries can be dropped on read.
        let mut guard = self.inner.write().await;
        match guard.get(&account_id) {
            Some(entry) if entry.loaded_at.elapsed() < self.ttl => {
                return Some(entry.account.clone());
            }
            Some(_) => {
                guard.remove(&account_id);
            }
            None => {}
        }
        None
    }

    /// Store the latest copy of an account
    pub async fn remember(&self, account: Account) {
        let entry = CachedAccount {
            account,
            loaded_at: Instant::now(),
        };
        self.inner.write().await.insert(entry.account.id, entry);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::AccountStatus;

    fn account(status: AccountStatus) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: "agent@example.com".to_string(),
            name: None,
            image: None,
            role: Some("editor".to_string()),
            status,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_remembered_account_is_returned() {
        let cache = SessionCache::new(Duration::from_secs(60));
        let stored = account(AccountStatus::Active);
        cache.remember(stored.clone()).await;

        let found = cache.get(stored.id).await.expect("cached");
        assert_eq!(found.email, stored.email);
        assert!(cache.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_latest_copy_replaces_earlier() {
        let cache = SessionCache::new(Duration::from_secs(60));
        let mut stored = account(AccountStatus::Active);
        cache.remember(stored.clone()).await;

        stored.status = AccountStatus::Suspended;
        cache.remember(stored.clone()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.get(stored.id).await.map(|a| a.status),
            Some(AccountStatus::Suspended)
        );
    }

    #[tokio::test]
    async fn test_stale_entry_is_dropped() {
        let cache = SessionCache::new(Duration::ZERO);
        let stored = account(AccountStatus::Active);
        cache.remember(stored.clone()).await;

        assert!(cache.get(stored.id).await.is_none());
        assert_eq!(cache.len().await, 0);
    }
}
