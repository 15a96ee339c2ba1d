//! Capability traits
//!
//! The pipeline depends on injected capabilities with narrow contracts.
//! All implementations are provided at construction; the core owns no
//! network clients.

pub mod cache;
pub mod llm;
pub mod retrieval;
pub mod translate;

pub use cache::{CacheStore, RECENT_LIST_KEY};
pub use llm::{ClassifierModel, FaithfulnessScorer, ResponseModel};
pub use retrieval::{Embedder, IndexMatch, Reranker, VectorIndex};
pub use translate::Translator;
