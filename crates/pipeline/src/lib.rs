//! Query-processing pipeline
//!
//! Sequences the stages of a single request: routing, translation,
//! classification, cache lookup, retrieval, generation, faithfulness
//! checking, translation of the answer, and the cache write. Enforces
//! per-stage budgets under a request deadline, honors cooperative
//! cancellation, and reports staged progress to an optional consumer.

pub mod faithfulness;
pub mod orchestrator;
pub mod progress;
pub mod router;

pub use faithfulness::{Assessment, FaithfulnessGuard, FaithfulnessVerdict, DEGRADED_RESPONSE_MESSAGE};
pub use orchestrator::{ClimatePipeline, HARMFUL_MESSAGE, OFF_TOPIC_MESSAGE};
pub use progress::{progress_channel, ProgressSender};
pub use router::{LanguageRouter, LANGUAGE_MISMATCH_MESSAGE};
