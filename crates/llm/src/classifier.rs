//! Classifier/rewriter adapter
//!
//! Turns a single structured LLM call into a [`ClassifierVerdict`]. The
//! protocol is four labeled lines; parsing is line-regex based and any
//! missing field falls back to the conservative default, so a degenerate
//! response classifies as off-topic rather than slipping through.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use climate_agent_core::{
    Classification, ClassifierModel, ClassifierVerdict, Language, LanguageMatch, Message, Result,
};

use crate::prompt::{classifier_prompt, CLASSIFIER_SYSTEM};

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^Language:\s*([a-z]{2}|unknown)\b").expect("static regex"));
static CLASSIFICATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^Classification:\s*(on-topic|off-topic|harmful)\b").expect("static regex")
});
static MATCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^LanguageMatch:\s*(yes|no|unknown)\b").expect("static regex"));
static REWRITTEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^Rewritten:\s*(.+)$").expect("static regex"));

/// Parse the raw classifier response into a verdict.
///
/// `Rewritten: N/A` leaves the query unchanged. Unknown language codes are
/// treated as unknown detection.
pub fn parse_verdict(text: &str) -> ClassifierVerdict {
    let detected_language = LANGUAGE_RE
        .captures(text)
        .map(|c| c[1].to_lowercase())
        .filter(|code| code != "unknown")
        .and_then(|code| Language::from_code(&code));

    let classification = CLASSIFICATION_RE
        .captures(text)
        .map(|c| match c[1].to_lowercase().as_str() {
            "on-topic" => Classification::OnTopic,
            "harmful" => Classification::Harmful,
            _ => Classification::OffTopic,
        })
        .unwrap_or(Classification::OffTopic);

    let language_match = MATCH_RE
        .captures(text)
        .map(|c| match c[1].to_lowercase().as_str() {
            "yes" => LanguageMatch::Yes,
            "no" => LanguageMatch::No,
            _ => LanguageMatch::Unknown,
        })
        .unwrap_or(LanguageMatch::Unknown);

    let rewritten_query = REWRITTEN_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|r| !r.is_empty() && r.to_lowercase() != "n/a");

    ClassifierVerdict {
        detected_language,
        classification,
        language_match,
        rewritten_query,
    }
}

/// Classifier over an injected model
pub struct QueryClassifier {
    model: Arc<dyn ClassifierModel>,
}

impl QueryClassifier {
    pub fn new(model: Arc<dyn ClassifierModel>) -> Self {
        Self { model }
    }

    /// Classify and rewrite a query.
    ///
    /// The original (untranslated) query is passed so the model can detect
    /// its language.
    pub async fn classify(
        &self,
        query: &str,
        history: &[Message],
        declared: Language,
    ) -> Result<ClassifierVerdict> {
        let prompt = classifier_prompt(query, history, declared);
        let raw = self.model.generate_structured(&prompt, CLASSIFIER_SYSTEM).await?;
        let verdict = parse_verdict(&raw);
        tracing::info!(
            detected = ?verdict.detected_language.map(|l| l.code()),
            classification = ?verdict.classification,
            language_match = ?verdict.language_match,
            rewritten = verdict.rewritten_query.is_some(),
            "classifier verdict"
        );
        Ok(verdict)
    }
}
