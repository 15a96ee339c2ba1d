//! Cache layer over an injected store
//!
//! Implements the pipeline's cache policy: exact lookup by language-scoped
//! key, fuzzy lookup over the recent-query index, and the dual-language
//! write (declared language plus English canonical). Store failures are
//! logged and degrade to misses/no-ops.

use std::sync::Arc;
use std::time::Duration;

use climate_agent_core::{CacheStore, ModelFamily, QueryOutcome};

use crate::key::CacheKey;
use crate::recent::{best_match, RecentEntry};

/// Cache policy knobs
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry time-to-live
    pub ttl: Duration,
    /// Bound on the recent-query index
    pub recent_list_size: usize,
    /// How many recent entries the fuzzy matcher scans
    pub fuzzy_scan_window: usize,
    /// Jaccard similarity required for a fuzzy hit
    pub fuzzy_threshold: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            recent_list_size: 100,
            fuzzy_scan_window: 50,
            fuzzy_threshold: 0.92,
        }
    }
}

/// A fuzzy lookup result
#[derive(Debug, Clone)]
pub struct FuzzyHit {
    pub outcome: QueryOutcome,
    pub similarity: f32,
}

/// Language-scoped response cache
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Exact lookup by key. Returns the stored outcome as written; the
    /// caller rewrites `processing_time` for the current request.
    pub async fn lookup_exact(&self, key: &CacheKey) -> Option<QueryOutcome> {
        match self.store.get(key.as_str()).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache get failed, treating as miss");
                None
            }
        }
    }

    /// Fuzzy lookup over the recent-query index, same language only.
    pub async fn lookup_fuzzy(&self, normalized: &str, lang: &str) -> Option<FuzzyHit> {
        let raw = match self.store.read_recent(self.config.fuzzy_scan_window).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "recent list unavailable, skipping fuzzy match");
                return None;
            }
        };

        let entries: Vec<RecentEntry> = raw.iter().filter_map(|r| RecentEntry::parse(r)).collect();
        let (entry, similarity) = best_match(&entries, normalized, lang)?;
        if similarity < self.config.fuzzy_threshold {
            return None;
        }

        match self.store.get(&entry.key).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(outcome) => {
                    tracing::info!(similarity, key = %entry.key, "fuzzy cache hit");
                    Some(FuzzyHit { outcome, similarity })
                }
                Err(e) => {
                    tracing::warn!(key = %entry.key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %entry.key, error = %e, "cache get failed during fuzzy match");
                None
            }
        }
    }

    /// Exact-then-fuzzy lookup
    pub async fn lookup(&self, key: &CacheKey, normalized: &str, lang: &str) -> Option<QueryOutcome> {
        if let Some(outcome) = self.lookup_exact(key).await {
            tracing::info!(key = %key, "cache hit");
            return Some(outcome);
        }
        self.lookup_fuzzy(normalized, lang).await.map(|hit| hit.outcome)
    }

    /// Write a freshly generated result.
    ///
    /// Stores the outcome under the declared-language key. When the declared
    /// language is not English, the English canonical response is stored
    /// under the English key for the same normalized query, so a later
    /// English request reuses the work. Finally the recent-query index is
    /// updated. All of this is best-effort.
    pub async fn store_outcome(
        &self,
        lang: &str,
        family: ModelFamily,
        normalized: &str,
        outcome: &QueryOutcome,
        english_response: &str,
    ) {
        let key = CacheKey::new(lang, family, normalized);
        self.write(&key, outcome).await;

        if lang != "en" {
            let english_outcome = QueryOutcome {
                response: english_response.to_string(),
                language_code: "en".to_string(),
                ..outcome.clone()
            };
            let english_key = CacheKey::new("en", family, normalized);
            self.write(&english_key, &english_outcome).await;
        }

        let entry = RecentEntry::new(key.as_str(), normalized, lang);
        if let Err(e) = self
            .store
            .push_recent(&entry.encode(), self.config.recent_list_size)
            .await
        {
            tracing::warn!(error = %e, "recent list update skipped");
        }
    }

    async fn write(&self, key: &CacheKey, outcome: &QueryOutcome) {
        let value = match serde_json::to_value(outcome) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(key.as_str(), &value, self.config.ttl).await {
            tracing::warn!(key = %key, error = %e, "cache set failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::normalize_query;

    fn outcome(response: &str, lang: &str) -> QueryOutcome {
        QueryOutcome {
            success: true,
            response: response.to_string(),
            citations: Vec::new(),
            faithfulness_score: 0.85,
            processing_time: 1.2,
            language_code: lang.to_string(),
            model_used: "test-model".to_string(),
            model_family: "primary".to_string(),
        }
    }

    fn layer() -> CacheLayer {
        CacheLayer::new(Arc::new(MemoryStore::new()), CacheConfig::default())
    }

    #[tokio::test]
    async fn test_exact_roundtrip_is_identical() {
        let layer = layer();
        let normalized = normalize_query("What causes climate change?");
        let stored = outcome("answer", "en");

        layer
            .store_outcome("en", ModelFamily::Primary, &normalized, &stored, "answer")
            .await;

        let key = CacheKey::new("en", ModelFamily::Primary, &normalized);
        let hit = layer.lookup_exact(&key).await.unwrap();
        assert_eq!(hit, stored);
    }

    #[tokio::test]
    async fn test_dual_write_for_non_english() {
        let layer = layer();
        let normalized = normalize_query("what causes climate change?");
        let spanish = outcome("respuesta en español", "es");

        layer
            .store_outcome("es", ModelFamily::Primary, &normalized, &spanish, "english answer")
            .await;

        let es_key = CacheKey::new("es", ModelFamily::Primary, &normalized);
        let en_key = CacheKey::new("en", ModelFamily::Primary, &normalized);

        let es_hit = layer.lookup_exact(&es_key).await.unwrap();
        assert_eq!(es_hit.response, "respuesta en español");
        assert_eq!(es_hit.language_code, "es");

        let en_hit = layer.lookup_exact(&en_key).await.unwrap();
        assert_eq!(en_hit.response, "english answer");
        assert_eq!(en_hit.language_code, "en");
        assert_eq!(en_hit.faithfulness_score, es_hit.faithfulness_score);
    }

    #[tokio::test]
    async fn test_english_write_is_single() {
        let layer = layer();
        let normalized = "what causes climate change?";
        layer
            .store_outcome("en", ModelFamily::Primary, normalized, &outcome("a", "en"), "a")
            .await;

        // The only recent entry carries the English language tag
        let hit = layer.lookup_fuzzy(normalized, "en").await.unwrap();
        assert_eq!(hit.similarity, 1.0);
        assert!(layer.lookup_fuzzy(normalized, "es").await.is_none());
    }

    #[tokio::test]
    async fn test_fuzzy_hit_same_language_only() {
        let layer = layer();
        let normalized = normalize_query("What causes climate change?");
        layer
            .store_outcome("en", ModelFamily::Primary, &normalized, &outcome("a", "en"), "a")
            .await;

        // Same normalized text in another language does not match
        assert!(layer.lookup_fuzzy(&normalized, "fr").await.is_none());

        let hit = layer.lookup_fuzzy("what causes climate change?", "en").await.unwrap();
        assert_eq!(hit.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let layer = layer();
        let key = CacheKey::new("en", ModelFamily::Primary, "never stored");
        assert!(layer.lookup(&key, "never stored", "en").await.is_none());
    }
}
