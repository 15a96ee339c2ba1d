//! Document retrieval for the climate agent
//!
//! The retriever composes three injected capabilities — embedder, vector
//! index, reranker — into one operation: embed the query, fetch the top-K
//! candidates, normalize them into documents, rerank, and return the top-N.
//! Also ships concrete capability implementations for self-contained
//! deployments: an HTTP embedder, an in-memory cosine index, and a lexical
//! reranker.

pub mod embeddings;
pub mod reranker;
pub mod retriever;
pub mod vector_store;

pub use embeddings::{EmbeddingConfig, HttpEmbedder};
pub use reranker::LexicalReranker;
pub use retriever::{DocumentRetriever, RetrieverConfig};
pub use vector_store::MemoryVectorIndex;
