//! Cache store capability

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Key under which the recent-query list is stored
pub const RECENT_LIST_KEY: &str = "q:recent";

/// Shared cache backing the pipeline's cache layer.
///
/// Values are self-describing JSON documents. Every operation may fail;
/// callers degrade failures to miss/no-op and log them, never surfacing
/// them to the user.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Fetch a value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store a value with a time-to-live
    async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<()>;

    /// Prepend an entry to the recent-query list, trimming it to `max_len`
    async fn push_recent(&self, entry: &str, max_len: usize) -> Result<()>;

    /// Read up to `n` most recent entries, newest first
    async fn read_recent(&self, n: usize) -> Result<Vec<String>>;
}
