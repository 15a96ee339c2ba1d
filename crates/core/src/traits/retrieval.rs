//! Retrieval capability traits

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::Result;

/// Text embedder.
///
/// Must be safe for concurrent use; the first call may be expensive
/// (model load), so callers should not assume uniform latency.
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A raw match from the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    /// Source metadata; the retriever reads `title`, `url`, and `content`
    /// (with `chunk_text` as a content fallback) out of this map
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl IndexMatch {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Vector index query interface
#[async_trait]
pub trait VectorIndex: Send + Sync + 'static {
    /// Return the `top_k` nearest matches for the query vector
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
}

/// Document reranker
#[async_trait]
pub trait Reranker: Send + Sync + 'static {
    /// Reorder candidates by relevance to the query and keep the best
    /// `top_k`
    async fn rerank(&self, query: &str, candidates: Vec<Document>, top_k: usize) -> Result<Vec<Document>>;
}
