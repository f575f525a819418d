use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::SecurityStore;
use crate::shared::AppResult;

/// In-process security store with lazy expiry.
#[derive(Default)]
pub struct InMemorySecurityStore {
    entries: DashMap<String, (Instant, String)>,
}

impl InMemorySecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
    }
}

#[async_trait::async_trait]
impl SecurityStore for InMemorySecurityStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.cleanup();
        let mut claimed = false;
        self.entries.entry(key.to_string()).or_insert_with(|| {
            claimed = true;
            (Instant::now() + ttl, value.to_string())
        });
        Ok(claimed)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.cleanup();
        Ok(self.entries.get(key).map(|entry| entry.value().1.clone()))
    }

    async fn incr(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        self.cleanup();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| (Instant::now() + ttl, "0".to_string()));
        let next = entry.value().1.parse::<i64>().unwrap_or(0) + 1;
        entry.value_mut().1 = next.to_string();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_claims_once() {
        let store = InMemorySecurityStore::new();
        let ttl = Duration::from_secs(60);
        assert!(store.set_if_absent("nonce:a", "1", ttl).await.unwrap());
        assert!(!store.set_if_absent("nonce:a", "1", ttl).await.unwrap());
        assert_eq!(store.get("nonce:a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn incr_is_monotonic_within_ttl() {
        let store = InMemorySecurityStore::new();
        let ttl = Duration::from_secs(60);
        assert_eq!(store.incr("rl:src:1", ttl).await.unwrap(), 1);
        assert_eq!(store.incr("rl:src:1", ttl).await.unwrap(), 2);
        assert_eq!(store.incr("rl:src:1", ttl).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_reclaimed() {
        let store = InMemorySecurityStore::new();
        let ttl = Duration::from_millis(10);
        assert!(store.set_if_absent("idem:x", "1", ttl).await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("idem:x").await.unwrap(), None);
        assert!(store.set_if_absent("idem:x", "2", ttl).await.unwrap());
    }
}
