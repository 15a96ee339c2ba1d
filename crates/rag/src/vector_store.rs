//! In-memory vector index
//!
//! Cosine-similarity index over embedded documents, suitable for tests and
//! small corpora indexed at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use climate_agent_core::{Document, Embedder, IndexMatch, Result, VectorIndex};

struct Entry {
    id: String,
    vector: Vec<f32>,
    metadata: HashMap<String, serde_json::Value>,
}

/// In-memory cosine-similarity index
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vector with arbitrary metadata
    pub fn insert(
        &self,
        id: impl Into<String>,
        vector: Vec<f32>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        self.entries.write().push(Entry {
            id: id.into(),
            vector,
            metadata,
        });
    }

    /// Embed and index a batch of documents
    pub async fn index_documents(&self, embedder: &Arc<dyn Embedder>, docs: &[Document]) -> Result<usize> {
        let mut indexed = 0;
        for doc in docs {
            let vector = embedder.embed(&doc.content).await?;
            let mut metadata = HashMap::new();
            metadata.insert("title".to_string(), serde_json::json!(doc.title));
            metadata.insert("url".to_string(), serde_json::json!(doc.url));
            metadata.insert("content".to_string(), serde_json::json!(doc.content));
            self.insert(doc.title.clone(), vector, metadata);
            indexed += 1;
        }
        tracing::info!(indexed, "indexed documents");
        Ok(indexed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let entries = self.entries.read();
        let mut scored: Vec<IndexMatch> = entries
            .iter()
            .map(|entry| {
                let mut m = IndexMatch::new(entry.id.clone(), cosine(vector, &entry.vector));
                m.metadata = entry.metadata.clone();
                m
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
