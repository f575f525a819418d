//! Shared-state primitive for idempotency keys, replay nonces, and
//! rate-limit counters.
//!
//! The store is volatile by contract: entries carry a mandatory TTL and may
//! be evicted at any time. Two variants exist: a Postgres-backed store that
//! uses the shared database as the coordination service, and an in-process
//! map for single-node and test deployments.

mod memory;
mod sql;

use std::time::Duration;

use crate::shared::AppResult;

pub use memory::InMemorySecurityStore;
pub use sql::SqlSecurityStore;

#[async_trait::async_trait]
pub trait SecurityStore: Send + Sync {
    /// Store `value` under `key` unless the key is already present and
    /// unexpired. Returns true when this call claimed the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool>;

    /// Fetch the unexpired value for `key`.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Increment the counter at `key`, creating it with the given TTL when
    /// absent or expired. Returns the post-increment count.
    async fn incr(&self, key: &str, ttl: Duration) -> AppResult<i64>;
}
