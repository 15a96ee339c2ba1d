//! In-memory cache store
//!
//! TTL-bounded store for tests and single-node deployments. Entries are
//! expired lazily on read; the recent-query list lives in a bounded deque.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use climate_agent_core::{CacheStore, Result};

struct StoredValue {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Dashmap-backed [`CacheStore`]
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    recent: Mutex<VecDeque<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        if let Some(stored) = self.entries.get(key) {
            if stored.expires_at > Instant::now() {
                return Ok(Some(stored.value.clone()));
            }
        }
        // Drop expired entries on the way out
        self.entries
            .remove_if(key, |_, stored| stored.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn push_recent(&self, entry: &str, max_len: usize) -> Result<()> {
        let mut recent = self.recent.lock();
        recent.push_front(entry.to_string());
        recent.truncate(max_len);
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<String>> {
        Ok(self.recent.lock().iter().take(n).cloned().collect())
    }
}
