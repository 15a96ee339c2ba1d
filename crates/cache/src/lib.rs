//! Response cache for the query pipeline
//!
//! Guarantees at most one generated artifact per
//! `(declared_language, family, normalized_query)` and enables reuse across
//! near-duplicate queries within the same language:
//! - Language-scoped keys (language in both the prefix and the hashed
//!   material)
//! - Exact and fuzzy lookup over a bounded recent-query index
//! - Dual-language write policy (declared language + English canonical)
//! - An in-memory store for tests and single-node deployments
//!
//! Every store failure degrades to a miss or no-op with a warning; the
//! pipeline behaves as if the cache were absent.

pub mod key;
pub mod layer;
pub mod memory;
pub mod recent;

pub use key::{normalize_query, CacheKey};
pub use layer::{CacheConfig, CacheLayer, FuzzyHit};
pub use memory::MemoryStore;
pub use recent::{jaccard, RecentEntry};
