//! Core traits and types for the climate agent
//!
//! This crate provides foundational types used across all other crates:
//! - Capability traits for pluggable backends (LLM, translator, retrieval, cache)
//! - The language registry (supported languages, model families, scripts)
//! - Query/result data model shared by the pipeline stages
//! - Conversation types and the history parser
//! - Error taxonomy

pub mod conversation;
pub mod document;
pub mod error;
pub mod language;
pub mod query;
pub mod traits;

pub use conversation::{parse_history, Message, Role};
pub use document::{preprocess_documents, Citation, Document};
pub use error::{Error, Result};
pub use language::{Language, ModelFamily, Script};
pub use query::{
    Classification, ClassifierVerdict, LanguageMatch, ProgressEvent, QueryOutcome, QueryRequest,
    RoutingVerdict, Stage,
};

pub use traits::{
    CacheStore, ClassifierModel, Embedder, FaithfulnessScorer, IndexMatch, Reranker,
    ResponseModel, Translator, VectorIndex, RECENT_LIST_KEY,
};
