//! Query pipeline data model
//!
//! Verdicts, results, and progress events flowing between pipeline stages.
//! All of these are owned outputs; stages never mutate another stage's
//! output.

use serde::{Deserialize, Serialize};

use crate::document::Citation;
use crate::language::{Language, ModelFamily};
use crate::conversation::Message;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Route,
    TranslateIn,
    Classify,
    CacheLookup,
    Retrieve,
    Generate,
    Faithfulness,
    TranslateOut,
    CacheWrite,
}

impl Stage {
    /// Stable name for logs and error payloads
    pub fn name(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::TranslateIn => "translate_in",
            Self::Classify => "classify",
            Self::CacheLookup => "cache_lookup",
            Self::Retrieve => "retrieve",
            Self::Generate => "generate",
            Self::Faithfulness => "faithfulness",
            Self::TranslateOut => "translate_out",
            Self::CacheWrite => "cache_write",
        }
    }

    /// Gerund phrase for user-facing timeout/failure messages
    pub fn gerund(&self) -> &'static str {
        match self {
            Self::Route => "routing your question",
            Self::TranslateIn => "translating your question",
            Self::Classify => "analyzing your question",
            Self::CacheLookup => "checking for previous answers",
            Self::Retrieve => "searching for relevant information",
            Self::Generate => "formulating a response",
            Self::Faithfulness => "verifying the answer",
            Self::TranslateOut => "translating the answer",
            Self::CacheWrite => "saving the answer",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Routing decision, produced once per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingVerdict {
    /// Whether the pipeline may continue
    pub should_proceed: bool,
    /// Response-model family serving the declared language
    pub family: ModelFamily,
    /// Whether the final answer must be translated out of English
    pub needs_translation: bool,
    /// Declared and detected languages disagree (lenient flag)
    pub language_mismatch: bool,
    /// Heuristically detected language, when definite
    pub detected: Option<Language>,
    /// User-facing message when `should_proceed` is false or a mismatch
    /// was flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Query as the pipeline will process it
    pub processed_query: String,
    /// English canonical form of the query
    pub english_query: String,
}

/// Topic classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    OnTopic,
    OffTopic,
    Harmful,
}

/// Classifier's view on whether the utterance matches the declared language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMatch {
    Yes,
    No,
    Unknown,
}

/// Parsed classifier/rewriter response.
///
/// Fields missing from the raw response default to the conservative values
/// (`OffTopic`, `Unknown`). Any classification other than `OnTopic` is a
/// terminal refusal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    /// Language the classifier detected, `None` when unknown
    pub detected_language: Option<Language>,
    pub classification: Classification,
    pub language_match: LanguageMatch,
    /// Cleaned, retrieval-ready rewrite of the query; `None` keeps the
    /// original
    pub rewritten_query: Option<String>,
}

impl Default for ClassifierVerdict {
    fn default() -> Self {
        Self {
            detected_language: None,
            classification: Classification::OffTopic,
            language_match: LanguageMatch::Unknown,
            rewritten_query: None,
        }
    }
}

/// A request entering the pipeline
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    /// Declared UI language code (2-letter, possibly with region variant)
    pub language: String,
    pub history: Vec<Message>,
    pub skip_cache: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: language.into(),
            history: Vec::new(),
            skip_cache: false,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_skip_cache(mut self, skip_cache: bool) -> Self {
        self.skip_cache = skip_cache;
        self
    }
}

/// Final result of a query, also the shape cached between requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub response: String,
    pub citations: Vec<Citation>,
    pub faithfulness_score: f32,
    /// Wall-clock seconds the producing request took. Rewritten on cache
    /// hits to the current request's elapsed time.
    pub processing_time: f64,
    pub language_code: String,
    pub model_used: String,
    pub model_family: String,
}

impl QueryOutcome {
    /// Standardized error result
    pub fn error(message: impl Into<String>, language_code: &str, processing_time: f64) -> Self {
        Self {
            success: false,
            response: message.into(),
            citations: Vec::new(),
            faithfulness_score: 0.0,
            processing_time,
            language_code: language_code.to_string(),
            model_used: "N/A".to_string(),
            model_family: "N/A".to_string(),
        }
    }
}

/// A progress report emitted at a stage boundary.
///
/// For any single request, `pct` never decreases, and the final event is
/// always `("Complete", 1.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: String,
    pub pct: f32,
}

impl ProgressEvent {
    pub fn new(stage: impl Into<String>, pct: f32) -> Self {
        Self {
            stage: stage.into(),
            pct: pct.clamp(0.0, 1.0),
        }
    }
}
