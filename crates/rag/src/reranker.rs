//! Lexical reranker
//!
//! Token-overlap scoring, useful as a fallback when no cross-encoder
//! capability is wired in. The overlap score is blended with the vector
//! score when one is present.

use async_trait::async_trait;

use climate_agent_core::{Document, Reranker, Result};

/// Reranker scoring by keyword overlap
#[derive(Default)]
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }

    /// Overlap score between query and document text
    fn score(query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let doc_lower = document.to_lowercase();

        let query_words: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
        let doc_words: std::collections::HashSet<&str> = doc_lower.split_whitespace().collect();

        let overlap = query_words.intersection(&doc_words).count();
        let union = query_words.union(&doc_words).count();

        if union > 0 {
            overlap as f32 / union as f32
        } else {
            0.0
        }
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(&self, query: &str, candidates: Vec<Document>, top_k: usize) -> Result<Vec<Document>> {
        let mut scored: Vec<Document> = candidates
            .into_iter()
            .map(|doc| {
                let lexical = Self::score(query, &doc.content);
                let combined = match doc.score {
                    Some(vector_score) => vector_score * 0.3 + lexical * 0.7,
                    None => lexical,
                };
                doc.with_score(combined)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .total_cmp(&a.score.unwrap_or(0.0))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
