//! Query-to-documents retrieval
//!
//! embed → vector top-K → normalize → rerank → top-N. Any capability error
//! degrades to an empty document list with a warning; the generator is
//! still invoked downstream and may answer from conversation history.

use std::sync::Arc;

use climate_agent_core::{
    preprocess_documents, Document, Embedder, Error, IndexMatch, Reranker, Result, VectorIndex,
};

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Candidates fetched from the vector index
    pub top_k: usize,
    /// Documents returned after reranking
    pub final_n: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { top_k: 20, final_n: 6 }
    }
}

/// Retriever over injected embedding/index/rerank capabilities
pub struct DocumentRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reranker: Arc<dyn Reranker>,
    config: RetrieverConfig,
}

impl DocumentRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: Arc<dyn Reranker>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker,
            config,
        }
    }

    /// Retrieve documents for a query, degrading failures to an empty list
    pub async fn retrieve(&self, query: &str) -> Vec<Document> {
        match self.try_retrieve(query).await {
            Ok(docs) => {
                tracing::info!(count = docs.len(), "retrieved documents");
                docs
            }
            Err(e) => {
                tracing::warn!(error = %e, "document retrieval failed, continuing without documents");
                Vec::new()
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.index.query(&vector, self.config.top_k).await?;

        let raw: Vec<Document> = matches.into_iter().filter_map(to_document).collect();
        let candidates = preprocess_documents(raw);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        self.reranker
            .rerank(query, candidates, self.config.final_n)
            .await
    }
}

/// Build a document from index-match metadata.
///
/// `content` is the primary field with `chunk_text` as fallback; `url` may
/// arrive as a string or a list of strings (first one wins).
fn to_document(m: IndexMatch) -> Option<Document> {
    let title = metadata_str(&m, "title")?;
    let content = metadata_str(&m, "content")
        .or_else(|| metadata_str(&m, "chunk_text"))?;

    let url = match m.metadata.get("url") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .find_map(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    Some(Document::new(title, url, content).with_score(m.score))
}

fn metadata_str(m: &IndexMatch, key: &str) -> Option<String> {
    m.metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

// Convenience constructor for errors raised by retrieval impls in this
// crate.
pub(crate) fn retrieval_error(message: impl Into<String>) -> Error {
    Error::Retrieval(message.into())
}
