//! Classifier, response generation, and chat backends
//!
//! - `classifier`: turns one structured LLM call into a typed verdict
//! - `generator`: family-dispatched grounded answer generation
//! - `prompt`: system messages and prompt builders
//! - `backend`: reqwest chat backend implementing the model capabilities
//! - `scorer`: LLM-backed faithfulness scoring

pub mod backend;
pub mod classifier;
pub mod generator;
pub mod prompt;
pub mod scorer;

pub use backend::{ChatConfig, HttpChatBackend};
pub use classifier::{parse_verdict, QueryClassifier};
pub use generator::{GeneratorConfig, ResponseGenerator, NO_DOCUMENTS_MESSAGE};
pub use prompt::CLIMATE_SYSTEM_MESSAGE;
pub use scorer::LlmFaithfulnessScorer;
