//! Unified response generator
//!
//! One generation algorithm shared by both model families, with
//! family-specific behavior limited to two hooks: which backend is called,
//! and how conversation history is prepared (the primary family re-scores
//! history turns for relevance; the secondary family passes history through
//! in its backend's native shape).
//!
//! Answers are always generated in English; translation happens in the
//! pipeline's translate-out stage.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use sha2::{Digest, Sha256};

use climate_agent_core::{
    preprocess_documents, Citation, ClassifierModel, Document, Error, Message, ModelFamily,
    ResponseModel, Result,
};

use crate::prompt::{history_relevance_prompt, CLIMATE_SYSTEM_MESSAGE};

/// User-facing message when there is nothing to ground an answer on
pub const NO_DOCUMENTS_MESSAGE: &str =
    "I couldn't find any relevant information to answer your question. \
     Please try rephrasing it, or ask me something else about climate change.";

/// Title of the synthetic document used when answering from history alone
pub const CONTEXT_DOC_TITLE: &str = "Conversation Context";

static TRAILING_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^>]*)?/?>)+\s*$").expect("static regex"));
static TRAILING_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(-?\d+)$").expect("static regex"));

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Enable the inner response cache keyed on
    /// (language, family, query, document set)
    pub cache_enabled: bool,
    /// History turns scoring at or above this are kept (primary family)
    pub relevance_floor: i32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            relevance_floor: 3,
        }
    }
}

/// Family-dispatched response generator
pub struct ResponseGenerator {
    primary: Arc<dyn ResponseModel>,
    secondary: Arc<dyn ResponseModel>,
    scorer: Arc<dyn ClassifierModel>,
    cache: Mutex<HashMap<String, (String, Vec<Citation>)>>,
    config: GeneratorConfig,
}

impl ResponseGenerator {
    pub fn new(
        primary: Arc<dyn ResponseModel>,
        secondary: Arc<dyn ResponseModel>,
        scorer: Arc<dyn ClassifierModel>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            scorer,
            cache: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn model_for(&self, family: ModelFamily) -> &Arc<dyn ResponseModel> {
        match family {
            ModelFamily::Primary => &self.primary,
            ModelFamily::Secondary => &self.secondary,
        }
    }

    /// Backend model name for a family, for result records
    pub fn model_name(&self, family: ModelFamily) -> &str {
        self.model_for(family).model_name()
    }

    /// Generate an English answer grounded in `docs`.
    ///
    /// With no usable documents but a non-empty history, a synthetic
    /// conversation-context document lets the backend answer from the
    /// conversation; with neither, generation fails with the no-documents
    /// message.
    pub async fn generate(
        &self,
        query: &str,
        docs: Vec<Document>,
        family: ModelFamily,
        history: &[Message],
        language_code: &str,
    ) -> Result<(String, Vec<Citation>)> {
        let mut docs = preprocess_documents(docs);

        if docs.is_empty() {
            if history.is_empty() {
                return Err(Error::Model(NO_DOCUMENTS_MESSAGE.to_string()));
            }
            tracing::info!("no documents, answering from conversation context");
            docs = vec![Document::new(
                CONTEXT_DOC_TITLE,
                "",
                "This response is based on previous conversation context.",
            )];
        }

        let cache_key = self.cache_key(query, &docs, family, language_code);
        if self.config.cache_enabled {
            if let Some((answer, citations)) = self.cache.lock().get(&cache_key).cloned() {
                tracing::info!(family = %family, "generator cache hit");
                return Ok((answer, citations));
            }
        }

        let history = match family {
            ModelFamily::Primary => self.relevant_history(query, history).await,
            ModelFamily::Secondary => history.to_vec(),
        };

        let raw = self
            .model_for(family)
            .generate_answer(query, &docs, CLIMATE_SYSTEM_MESSAGE, &history)
            .await?;

        let answer = strip_trailing_html(&repair_markdown_headings(&raw));
        let citations = project_citations(&docs);

        if self.config.cache_enabled {
            self.cache
                .lock()
                .insert(cache_key, (answer.clone(), citations.clone()));
        }

        Ok((answer, citations))
    }

    /// Re-score history turns for relevance to the current query, keeping
    /// pairs that score at or above the floor. Scoring failures keep the
    /// history unchanged; too few surviving turns fall back to the two most
    /// recent messages.
    async fn relevant_history(&self, query: &str, history: &[Message]) -> Vec<Message> {
        if history.len() < 4 {
            return history.to_vec();
        }

        let turn_count = history.len() / 2;
        let prompt = history_relevance_prompt(query, turn_count);
        let raw = match self
            .scorer
            .generate_structured(&prompt, "Rate the relevance of conversation turns to the current query")
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "history relevance scoring failed, keeping full history");
                return history.to_vec();
            }
        };

        let scores = parse_relevance_scores(&raw);
        if scores.len() < turn_count {
            tracing::warn!(
                got = scores.len(),
                expected = turn_count,
                "too few relevance scores, keeping full history"
            );
            return history.to_vec();
        }

        let mut kept = Vec::new();
        for (i, score) in scores.iter().take(turn_count).enumerate() {
            if *score >= self.config.relevance_floor {
                let user_idx = i * 2;
                let assistant_idx = user_idx + 1;
                if assistant_idx < history.len() {
                    kept.push(history[user_idx].clone());
                    kept.push(history[assistant_idx].clone());
                }
            }
        }

        if kept.len() < 2 {
            kept = history[history.len() - 2..].to_vec();
        }

        tracing::info!(kept = kept.len(), total = history.len(), "optimized conversation history");
        kept
    }

    fn cache_key(
        &self,
        query: &str,
        docs: &[Document],
        family: ModelFamily,
        language_code: &str,
    ) -> String {
        let mut identifiers: Vec<String> = docs
            .iter()
            .map(|d| format!("{}:{}", d.title, d.url))
            .collect();
        identifiers.sort();

        let mut hasher = Sha256::new();
        hasher.update(language_code.as_bytes());
        hasher.update(b":");
        hasher.update(family.label().as_bytes());
        hasher.update(b":");
        hasher.update(query.to_lowercase().trim().as_bytes());
        for id in &identifiers {
            hasher.update(b"|");
            hasher.update(id.as_bytes());
        }

        let mut hex = String::with_capacity(64);
        for byte in hasher.finalize() {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

/// Parse a comma/newline separated score list, tolerating decorated tokens
/// like `[SYSTEM OUTPUT]: 4` by taking each token's trailing integer.
fn parse_relevance_scores(raw: &str) -> Vec<i32> {
    raw.replace('\n', ",")
        .split(',')
        .filter_map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return None;
            }
            TRAILING_INT_RE
                .captures(token)
                .and_then(|c| c[1].parse().ok())
        })
        .collect()
}

/// Ensure markdown headings carry a space after their `#` run
pub fn repair_markdown_headings(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            let hashes = line.len() - line.trim_start_matches('#').len();
            if line.chars().nth(hashes) != Some(' ') && hashes < line.len() {
                lines.push(format!("{} {}", &line[..hashes], &line[hashes..]));
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines.join("\n")
}

/// Drop stray HTML fragments a backend sometimes appends to its answer
pub fn strip_trailing_html(text: &str) -> String {
    TRAILING_TAG_RE.replace(text.trim_end(), "").trim_end().to_string()
}

/// Deduplicated citation projection, excluding the synthetic context
/// document unless it carries a URL
fn project_citations(docs: &[Document]) -> Vec<Citation> {
    let mut seen = std::collections::HashSet::new();
    docs.iter()
        .filter(|doc| doc.title != CONTEXT_DOC_TITLE || !doc.url.is_empty())
        .filter(|doc| seen.insert(doc.title.clone()))
        .map(Citation::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
    }

    impl CountingModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ResponseModel for CountingModel {
        async fn generate_answer(
            &self,
            _query: &str,
            _docs: &[Document],
            _system: &str,
            _history: &[Message],
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("#Answer\nGrounded text.".to_string())
        }

        fn model_name(&self) -> &str {
            "counting-model"
        }
    }

    struct FixedScorer(String);

    #[async_trait]
    impl ClassifierModel for FixedScorer {
        async fn generate_structured(&self, _prompt: &str, _system: &str) -> Result<String> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "fixed-scorer"
        }
    }

    fn generator(primary: Arc<CountingModel>, scorer_output: &str) -> ResponseGenerator {
        ResponseGenerator::new(
            primary,
            CountingModel::new(),
            Arc::new(FixedScorer(scorer_output.to_string())),
            GeneratorConfig::default(),
        )
    }

    fn doc(title: &str) -> Document {
        Document::new(title, format!("https://example.org/{title}"), "a reasonably long body of content")
    }

    #[tokio::test]
    async fn test_generate_returns_citations() {
        let model = CountingModel::new();
        let generator = generator(Arc::clone(&model), "");
        let docs = vec![doc("IPCC Overview"), doc("Carbon Cycle")];

        let (answer, citations) = generator
            .generate("q", docs, ModelFamily::Primary, &[], "en")
            .await
            .unwrap();
        assert!(answer.starts_with("# Answer"));
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "IPCC Overview");
    }

    #[tokio::test]
    async fn test_no_docs_no_history_fails() {
        let generator = generator(CountingModel::new(), "");
        let err = generator
            .generate("q", vec![], ModelFamily::Primary, &[], "en")
            .await
            .unwrap_err();
        match err {
            Error::Model(message) => assert_eq!(message, NO_DOCUMENTS_MESSAGE),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_docs_with_history_uses_context_doc() {
        let model = CountingModel::new();
        let generator = generator(Arc::clone(&model), "");
        let history = vec![Message::user("earlier question")];

        let (_, citations) = generator
            .generate("q", vec![], ModelFamily::Primary, &history, "en")
            .await
            .unwrap();
        // Synthetic doc carries no URL, so it is not cited
        assert!(citations.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inner_cache_prevents_second_backend_call() {
        let model = CountingModel::new();
        let generator = generator(Arc::clone(&model), "");
        let docs = vec![doc("A")];

        for _ in 0..2 {
            generator
                .generate("q", docs.clone(), ModelFamily::Primary, &[], "en")
                .await
                .unwrap();
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_scopes_on_document_set() {
        let model = CountingModel::new();
        let generator = generator(Arc::clone(&model), "");

        generator
            .generate("q", vec![doc("A")], ModelFamily::Primary, &[], "en")
            .await
            .unwrap();
        generator
            .generate("q", vec![doc("B")], ModelFamily::Primary, &[], "en")
            .await
            .unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_secondary_family_uses_secondary_backend() {
        let primary = CountingModel::new();
        let secondary = CountingModel::new();
        let generator = ResponseGenerator::new(
            Arc::clone(&primary) as Arc<dyn ResponseModel>,
            Arc::clone(&secondary) as Arc<dyn ResponseModel>,
            Arc::new(FixedScorer(String::new())),
            GeneratorConfig::default(),
        );

        generator
            .generate("q", vec![doc("A")], ModelFamily::Secondary, &[], "fr")
            .await
            .unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_rescoring_keeps_relevant_pairs() {
        let model = CountingModel::new();
        let generator = generator(Arc::clone(&model), "1,5");
        let history = vec![
            Message::user("irrelevant question"),
            Message::assistant("irrelevant answer"),
            Message::user("relevant question"),
            Message::assistant("relevant answer"),
        ];

        let kept = generator.relevant_history("q", &history).await;
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].content, "relevant question");
    }

    #[tokio::test]
    async fn test_history_rescoring_fallback_to_recent() {
        let generator = generator(CountingModel::new(), "1,1");
        let history = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
        ];

        let kept = generator.relevant_history("q", &history).await;
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].content, "q2");
    }

    #[test]
    fn test_parse_relevance_scores_tolerates_decoration() {
        assert_eq!(parse_relevance_scores("2,4,5"), vec![2, 4, 5]);
        assert_eq!(parse_relevance_scores("[SYSTEM OUTPUT]: 3\n4"), vec![3, 4]);
        assert_eq!(parse_relevance_scores("no numbers here"), Vec::<i32>::new());
    }

    #[test]
    fn test_repair_markdown_headings() {
        assert_eq!(repair_markdown_headings("#Title"), "# Title");
        assert_eq!(repair_markdown_headings("##Sub\nbody"), "## Sub\nbody");
        assert_eq!(repair_markdown_headings("# Already fine"), "# Already fine");
        assert_eq!(repair_markdown_headings("text # not a heading"), "text # not a heading");
    }

    #[test]
    fn test_strip_trailing_html() {
        assert_eq!(strip_trailing_html("Answer text.</div>"), "Answer text.");
        assert_eq!(strip_trailing_html("Answer.</p></div>  "), "Answer.");
        assert_eq!(strip_trailing_html("Keep <b>inline</b> html"), "Keep <b>inline</b> html");
    }

    #[test]
    fn test_citation_dedup_by_title() {
        let docs = vec![doc("Same"), doc("Same"), doc("Other")];
        let citations = project_citations(&docs);
        assert_eq!(citations.len(), 2);
    }
}
