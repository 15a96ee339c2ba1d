//! End-to-end pipeline tests over counting mock capabilities

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use climate_agent_cache::{normalize_query, CacheKey, MemoryStore};
use climate_agent_config::PipelineConfig;
use climate_agent_core::{
    CacheStore, ClassifierModel, Document, Embedder, Error, FaithfulnessScorer, IndexMatch,
    Message, ModelFamily, ProgressEvent, QueryRequest, ResponseModel, Result, Translator,
    VectorIndex,
};
use climate_agent_llm::{GeneratorConfig, ResponseGenerator, NO_DOCUMENTS_MESSAGE};
use climate_agent_pipeline::{
    progress_channel, ClimatePipeline, LANGUAGE_MISMATCH_MESSAGE, OFF_TOPIC_MESSAGE,
};
use climate_agent_rag::{DocumentRetriever, LexicalReranker, RetrieverConfig};

const ANSWER: &str = "# Grounded Answer\nClimate change is driven by greenhouse gas emissions.";

const ON_TOPIC: &str = "Language: en\nClassification: on-topic\nLanguageMatch: yes\nRewritten: N/A";
const ON_TOPIC_ES: &str = "Language: es\nClassification: on-topic\nLanguageMatch: yes\nRewritten: N/A";
const OFF_TOPIC: &str = "Language: en\nClassification: off-topic\nLanguageMatch: yes\nRewritten: N/A";

struct ScriptedClassifier {
    response: String,
    calls: AtomicUsize,
}

#[async_trait]
impl ClassifierModel for ScriptedClassifier {
    async fn generate_structured(&self, _prompt: &str, _system: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "scripted-classifier"
    }
}

struct CountingResponder {
    calls: AtomicUsize,
}

#[async_trait]
impl ResponseModel for CountingResponder {
    async fn generate_answer(
        &self,
        _query: &str,
        _docs: &[Document],
        _system: &str,
        _history: &[Message],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ANSWER.to_string())
    }

    fn model_name(&self) -> &str {
        "counting-responder"
    }
}

struct StaticEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::Retrieval("embedder offline".to_string()))
        } else {
            Ok(vec![1.0, 0.0])
        }
    }
}

struct StaticIndex;

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let titles = ["IPCC Overview", "Carbon Cycle", "Greenhouse Effect"];
        Ok(titles
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(i, title)| {
                IndexMatch::new(*title, 0.9 - i as f32 * 0.1)
                    .with_metadata("title", *title)
                    .with_metadata("url", format!("https://example.org/{i}"))
                    .with_metadata(
                        "content",
                        format!("{title}: climate change science content for grounding answers"),
                    )
            })
            .collect())
    }
}

struct FixedFaithScorer(f32);

#[async_trait]
impl FaithfulnessScorer for FixedFaithScorer {
    async fn score(&self, _q: &str, _a: &str, _c: &[String]) -> Result<f32> {
        Ok(self.0)
    }
}

struct TestTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for TestTranslator {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target == "English" {
            "What causes climate change?".to_string()
        } else {
            format!("[{target}] {text}")
        }
    }
}

struct Harness {
    pipeline: ClimatePipeline,
    store: Arc<MemoryStore>,
    classifier: Arc<ScriptedClassifier>,
    responder: Arc<CountingResponder>,
    embedder: Arc<StaticEmbedder>,
    translator: Arc<TestTranslator>,
}

fn harness(classifier_response: &str, embedder_fails: bool, faithfulness: f32) -> Harness {
    let classifier = Arc::new(ScriptedClassifier {
        response: classifier_response.to_string(),
        calls: AtomicUsize::new(0),
    });
    let responder = Arc::new(CountingResponder {
        calls: AtomicUsize::new(0),
    });
    let embedder = Arc::new(StaticEmbedder {
        calls: AtomicUsize::new(0),
        fail: embedder_fails,
    });
    let translator = Arc::new(TestTranslator {
        calls: AtomicUsize::new(0),
    });
    let store = Arc::new(MemoryStore::new());

    let generator = ResponseGenerator::new(
        Arc::clone(&responder) as Arc<dyn ResponseModel>,
        Arc::clone(&responder) as Arc<dyn ResponseModel>,
        Arc::clone(&classifier) as Arc<dyn ClassifierModel>,
        GeneratorConfig {
            cache_enabled: false,
            ..GeneratorConfig::default()
        },
    );
    let retriever = DocumentRetriever::new(
        Arc::clone(&embedder) as Arc<dyn Embedder>,
        Arc::new(StaticIndex),
        Arc::new(LexicalReranker::new()),
        RetrieverConfig::default(),
    );

    let pipeline = ClimatePipeline::new(
        Arc::clone(&classifier) as Arc<dyn ClassifierModel>,
        generator,
        retriever,
        Arc::new(FixedFaithScorer(faithfulness)),
        Arc::clone(&translator) as Arc<dyn Translator>,
        Arc::clone(&store) as Arc<dyn CacheStore>,
        PipelineConfig::default(),
    );

    Harness {
        pipeline,
        store,
        classifier,
        responder,
        embedder,
        translator,
    }
}

async fn drain(mut rx: tokio::sync::mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn english_on_topic_cold_cache() {
    let h = harness(ON_TOPIC, false, 0.85);
    let (progress, rx) = progress_channel(32);

    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            Some(progress),
            CancellationToken::new(),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.language_code, "en");
    assert_eq!(outcome.citations.len(), 3);
    assert!((outcome.faithfulness_score - 0.85).abs() < 1e-6);
    assert_eq!(outcome.model_family, "primary");
    assert_eq!(outcome.model_used, "counting-responder");
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);

    // Exactly one write, under the English key
    assert_eq!(h.store.len(), 1);
    let key = CacheKey::new(
        "en",
        ModelFamily::Primary,
        &normalize_query("What causes climate change?"),
    );
    assert!(h.store.get(key.as_str()).await.unwrap().is_some());

    // One monotonic progress sequence ending in (Complete, 1.0)
    let events = drain(rx).await;
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].pct <= w[1].pct));
    let last = events.last().unwrap();
    assert_eq!(last.stage, "Complete");
    assert_eq!(last.pct, 1.0);
}

#[tokio::test]
async fn spanish_writes_both_languages_and_warms_english() {
    let h = harness(ON_TOPIC_ES, false, 0.85);

    let spanish = h
        .pipeline
        .process(
            QueryRequest::new("¿Qué causa el cambio climático?", "es"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(spanish.success);
    assert_eq!(spanish.language_code, "es");
    assert!(spanish.response.starts_with("[Spanish]"));
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);

    // Declared-language and English-canonical entries
    assert_eq!(h.store.len(), 2);
    let normalized = normalize_query("What causes climate change?");
    let es_key = CacheKey::new("es", ModelFamily::Primary, &normalized);
    let en_key = CacheKey::new("en", ModelFamily::Primary, &normalized);
    assert!(h.store.get(es_key.as_str()).await.unwrap().is_some());
    assert!(h.store.get(en_key.as_str()).await.unwrap().is_some());

    // The English request reuses the Spanish run's work
    let english = h
        .pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(english.success);
    assert_eq!(english.language_code, "en");
    assert_eq!(english.response, ANSWER);
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn strict_language_mismatch_refuses_before_any_capability() {
    let h = harness(ON_TOPIC, false, 0.85);

    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("¿Qué es el cambio climático?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(!outcome.success);
    assert!(outcome.response.contains("different language than the one you selected"));
    assert_eq!(outcome.response, LANGUAGE_MISMATCH_MESSAGE);
    assert!(outcome.citations.is_empty());
    assert_eq!(outcome.faithfulness_score, 0.0);

    assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn off_topic_refusal_skips_retrieval_and_generation() {
    let h = harness(OFF_TOPIC, false, 0.85);

    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("Who won the last football match?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.response, OFF_TOPIC_MESSAGE);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn fuzzy_hit_within_same_language() {
    let h = harness(ON_TOPIC, false, 0.85);

    h.pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);

    // Lowercase, no punctuation: different exact key, identical token set
    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("what causes climate change", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.response, ANSWER);
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retrieval_failure_without_history_yields_no_documents_error() {
    let h = harness(ON_TOPIC, true, 0.85);

    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.response, NO_DOCUMENTS_MESSAGE);
    assert!(outcome.citations.is_empty());
    // Generation was attempted even though retrieval failed
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retrieval_failure_with_history_still_answers() {
    let h = harness(ON_TOPIC, true, 0.85);

    let request = QueryRequest::new("What causes climate change?", "en").with_history(vec![
        Message::user("Tell me about the greenhouse effect"),
        Message::assistant("The greenhouse effect works by..."),
    ]);
    let outcome = h.pipeline.process(request, None, CancellationToken::new()).await;

    assert!(outcome.success);
    assert!(outcome.citations.is_empty());
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn identical_requests_generate_once_unless_cache_skipped() {
    let h = harness(ON_TOPIC, false, 0.85);
    let request = QueryRequest::new("What causes climate change?", "en");

    for _ in 0..2 {
        h.pipeline
            .process(request.clone(), None, CancellationToken::new())
            .await;
    }
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 1);

    let skipping = harness(ON_TOPIC, false, 0.85);
    for _ in 0..2 {
        skipping
            .pipeline
            .process(
                request.clone().with_skip_cache(true),
                None,
                CancellationToken::new(),
            )
            .await;
    }
    assert_eq!(skipping.responder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_faithfulness_replaces_answer_and_keeps_citations() {
    let h = harness(ON_TOPIC, false, 0.2);

    let outcome = h
        .pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert!(outcome.success);
    assert_ne!(outcome.response, ANSWER);
    assert_eq!(outcome.citations.len(), 3);
    assert!((outcome.faithfulness_score - 0.2).abs() < 1e-6);
    // Replacement messages are not cached
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn cancellation_returns_partial_result_without_cache_write() {
    let h = harness(ON_TOPIC, false, 0.85);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h
        .pipeline
        .process(QueryRequest::new("What causes climate change?", "en"), None, cancel)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.response, "cancelled");
    assert!(h.store.is_empty());
    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
    let h = harness(ON_TOPIC, false, 0.85);

    let blank = h
        .pipeline
        .process(QueryRequest::new("   ", "en"), None, CancellationToken::new())
        .await;
    assert!(!blank.success);

    let oversize = h
        .pipeline
        .process(
            QueryRequest::new("x".repeat(2001), "en"),
            None,
            CancellationToken::new(),
        )
        .await;
    assert!(!oversize.success);

    let unknown_language = h
        .pipeline
        .process(
            QueryRequest::new("What causes climate change?", "xx"),
            None,
            CancellationToken::new(),
        )
        .await;
    assert!(!unknown_language.success);
    assert!(unknown_language.response.contains("language"));

    assert_eq!(h.responder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_ends_with_complete_even_on_refusal() {
    let h = harness(OFF_TOPIC, false, 0.85);
    let (progress, rx) = progress_channel(32);

    h.pipeline
        .process(
            QueryRequest::new("Who won the last football match?", "en"),
            Some(progress),
            CancellationToken::new(),
        )
        .await;

    let events = drain(rx).await;
    let last = events.last().unwrap();
    assert_eq!(last.stage, "Complete");
    assert_eq!(last.pct, 1.0);
    assert!(events.windows(2).all(|w| w[0].pct <= w[1].pct));
}

#[tokio::test]
async fn translator_not_called_for_english_requests() {
    let h = harness(ON_TOPIC, false, 0.85);

    h.pipeline
        .process(
            QueryRequest::new("What causes climate change?", "en"),
            None,
            CancellationToken::new(),
        )
        .await;

    assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
}
