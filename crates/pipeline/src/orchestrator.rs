//! Pipeline orchestrator
//!
//! Owns all per-request state and sequences the stages under per-stage
//! budgets clamped to the request deadline. Every capability call runs
//! inside [`ClimatePipeline::staged`], which races the call against its
//! budget and the cancellation signal and annotates failures with the
//! stage name. The recover-vs-surface policy:
//!
//! - retrieval and faithfulness failures/timeouts degrade (empty documents,
//!   fallback score)
//! - classifier and generation failures/timeouts fail the request
//! - cache failures are invisible to callers
//! - answer-translation failures keep the English answer

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use climate_agent_cache::{normalize_query, CacheConfig, CacheKey, CacheLayer};
use climate_agent_config::PipelineConfig;
use climate_agent_core::{
    CacheStore, Classification, ClassifierModel, Error, FaithfulnessScorer, Language,
    LanguageMatch, QueryOutcome, QueryRequest, Result, Stage, Translator,
};
use climate_agent_llm::{QueryClassifier, ResponseGenerator, NO_DOCUMENTS_MESSAGE};
use climate_agent_rag::DocumentRetriever;

use crate::faithfulness::{FaithfulnessGuard, FaithfulnessVerdict, DEGRADED_RESPONSE_MESSAGE};
use crate::progress::ProgressSender;
use crate::router::LanguageRouter;

/// Canned refusal for off-topic queries
pub const OFF_TOPIC_MESSAGE: &str =
    "I'm a climate change assistant and can only help with questions about climate, environment, \
     and sustainability.";

/// Canned refusal for harmful queries
pub const HARMFUL_MESSAGE: &str =
    "I can't assist with that request. Please ask me questions about climate change, environmental \
     issues, or sustainability.";

/// Fixed progress schedule, one entry per stage boundary
const PROGRESS_SCHEDULE: &[(&str, f32)] = &[
    ("Routing", 0.02),
    ("Translating", 0.08),
    ("Classifying", 0.14),
    ("CacheLookup", 0.20),
    ("Retrieving", 0.35),
    ("Generating", 0.70),
    ("Verifying", 0.90),
    ("Finalizing", 0.96),
    ("Complete", 1.0),
];

fn schedule(stage: &str) -> (&'static str, f32) {
    PROGRESS_SCHEDULE
        .iter()
        .copied()
        .find(|(name, _)| *name == stage)
        .unwrap_or(("Complete", 1.0))
}

/// The end-to-end query pipeline
pub struct ClimatePipeline {
    router: LanguageRouter,
    classifier: QueryClassifier,
    retriever: DocumentRetriever,
    generator: ResponseGenerator,
    guard: FaithfulnessGuard,
    cache: CacheLayer,
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
}

impl ClimatePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier_model: Arc<dyn ClassifierModel>,
        generator: ResponseGenerator,
        retriever: DocumentRetriever,
        scorer: Arc<dyn FaithfulnessScorer>,
        translator: Arc<dyn Translator>,
        store: Arc<dyn CacheStore>,
        config: PipelineConfig,
    ) -> Self {
        let cache = CacheLayer::new(
            store,
            CacheConfig {
                ttl: config.cache_ttl(),
                recent_list_size: config.recent_list_size,
                fuzzy_scan_window: config.fuzzy_scan_window,
                fuzzy_threshold: config.fuzzy_threshold,
            },
        );
        let guard = FaithfulnessGuard::new(
            scorer,
            config.faithfulness_threshold,
            config.faithfulness_degraded_floor,
        );

        Self {
            router: LanguageRouter::new(),
            classifier: QueryClassifier::new(classifier_model),
            retriever,
            generator,
            guard,
            cache,
            translator,
            config,
        }
    }

    /// Process one request end to end.
    ///
    /// Always returns an outcome; errors become error results with a
    /// human-readable `response`. The final progress event is always
    /// `("Complete", 1.0)` regardless of success.
    pub async fn process(
        &self,
        request: QueryRequest,
        progress: Option<ProgressSender>,
        cancel: CancellationToken,
    ) -> QueryOutcome {
        let started = Instant::now();
        let language_code = Language::normalize_code(&request.language);

        let outcome = match self.run(&request, &progress, &cancel, started).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    Error::Refusal(_) | Error::LanguageMismatch(_) | Error::InputInvalid(_) => {
                        tracing::info!(error = %e, "request refused")
                    }
                    Error::Cancelled => tracing::info!("request cancelled"),
                    other => tracing::error!(error = %other, stage = ?other.stage(), "pipeline error"),
                }
                QueryOutcome::error(e.user_message(), &language_code, started.elapsed().as_secs_f64())
            }
        };

        report(&progress, "Complete");
        tracing::info!(
            success = outcome.success,
            elapsed_s = outcome.processing_time,
            "query processed"
        );
        outcome
    }

    async fn run(
        &self,
        request: &QueryRequest,
        progress: &Option<ProgressSender>,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<QueryOutcome> {
        let deadline = started + self.config.request_deadline();
        let budgets = &self.config.stages;

        validate(request, self.config.max_history_messages)?;
        let declared = Language::from_code(&request.language).ok_or_else(|| {
            Error::InputInvalid(format!("Unsupported language code: {}", request.language))
        })?;

        // Stage 1: route
        report(progress, "Routing");
        let routing = self.router.route(&request.query, declared);
        if !routing.should_proceed {
            return Err(Error::LanguageMismatch(
                routing
                    .message
                    .unwrap_or_else(|| crate::router::LANGUAGE_MISMATCH_MESSAGE.to_string()),
            ));
        }
        let family = routing.family;

        // Stage 2: translate the query into English, unless the mismatch
        // flag makes the declared language untrustworthy
        let mut english_query = request.query.clone();
        if routing.needs_translation && !routing.language_mismatch {
            report(progress, "Translating");
            english_query = self
                .staged(Stage::TranslateIn, budgets.translate_in_ms, deadline, cancel, async {
                    Ok(self
                        .translator
                        .translate(&request.query, declared.name(), Language::English.name())
                        .await)
                })
                .await?;
        }

        // Stage 3: classify and rewrite. The original query goes in so the
        // model sees the utterance's own language.
        report(progress, "Classifying");
        let verdict = self
            .staged(
                Stage::Classify,
                budgets.classify_ms,
                deadline,
                cancel,
                self.classifier.classify(&request.query, &request.history, declared),
            )
            .await?;

        if verdict.language_match == LanguageMatch::No {
            if let Some(found) = verdict.detected_language {
                if found != declared {
                    tracing::warn!(
                        detected = found.code(),
                        declared = declared.code(),
                        "classifier flagged language mismatch"
                    );
                    return Err(Error::LanguageMismatch(
                        crate::router::LANGUAGE_MISMATCH_MESSAGE.to_string(),
                    ));
                }
            }
        }
        match verdict.classification {
            Classification::OnTopic => {}
            Classification::OffTopic => return Err(Error::Refusal(OFF_TOPIC_MESSAGE.to_string())),
            Classification::Harmful => return Err(Error::Refusal(HARMFUL_MESSAGE.to_string())),
        }

        let processed_query = verdict.rewritten_query.unwrap_or_else(|| english_query.clone());
        let normalized = normalize_query(&processed_query);
        let cache_key = CacheKey::new(declared.code(), family, &normalized);

        // Stage 4: cache lookup, exact then fuzzy. Failures and timeouts
        // are misses.
        if !request.skip_cache {
            report(progress, "CacheLookup");
            let lookup = self
                .staged(Stage::CacheLookup, budgets.cache_lookup_ms, deadline, cancel, async {
                    Ok(self.cache.lookup(&cache_key, &normalized, declared.code()).await)
                })
                .await;
            match lookup {
                Ok(Some(mut hit)) => {
                    hit.processing_time = started.elapsed().as_secs_f64();
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => tracing::warn!(error = %e, "cache lookup degraded to miss"),
            }
        }

        // Stage 5: retrieve. Failures and timeouts degrade to an empty
        // document list; generation still runs.
        report(progress, "Retrieving");
        let documents = match self
            .staged(Stage::Retrieve, budgets.retrieve_ms, deadline, cancel, async {
                Ok(self.retriever.retrieve(&processed_query).await)
            })
            .await
        {
            Ok(docs) => docs,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "retrieval degraded to empty document list");
                Vec::new()
            }
        };

        // Stage 6: generate the English answer
        report(progress, "Generating");
        let generated = self
            .staged(
                Stage::Generate,
                budgets.generate_ms,
                deadline,
                cancel,
                self.generator
                    .generate(&processed_query, documents, family, &request.history, "en"),
            )
            .await;
        let (mut answer, citations) = match generated {
            Ok(pair) => pair,
            Err(Error::UpstreamFailure { message, .. }) if message == NO_DOCUMENTS_MESSAGE => {
                return Ok(QueryOutcome::error(
                    NO_DOCUMENTS_MESSAGE,
                    declared.code(),
                    started.elapsed().as_secs_f64(),
                ));
            }
            Err(e) => return Err(e),
        };

        // Stage 7: faithfulness check against the contexts actually cited
        report(progress, "Verifying");
        let contexts: Vec<String> = citations.iter().take(5).map(|c| c.content.clone()).collect();
        let assessment = match self
            .staged(Stage::Faithfulness, budgets.faithfulness_ms, deadline, cancel, async {
                Ok(self.guard.assess(&english_query, &answer, &contexts).await)
            })
            .await
        {
            Ok(assessment) => assessment,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "faithfulness check degraded to fallback score");
                crate::faithfulness::Assessment {
                    score: crate::faithfulness::FALLBACK_SCORE,
                    verdict: FaithfulnessVerdict::Degraded,
                }
            }
        };

        let rejected = assessment.verdict == FaithfulnessVerdict::Rejected;
        if rejected {
            answer = DEGRADED_RESPONSE_MESSAGE.to_string();
        }

        // Stage 8: translate the answer into the declared language. A
        // failure keeps the English answer and still succeeds.
        report(progress, "Finalizing");
        let english_answer = answer.clone();
        if declared != Language::English {
            let translated = self
                .staged(Stage::TranslateOut, budgets.translate_out_ms, deadline, cancel, async {
                    Ok(self
                        .translator
                        .translate(&answer, Language::English.name(), declared.name())
                        .await)
                })
                .await;
            match translated {
                Ok(text) => answer = text,
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    tracing::warn!(error = %e, translation_failed = true, "keeping English answer");
                }
            }
        }

        let outcome = QueryOutcome {
            success: true,
            response: answer,
            citations,
            faithfulness_score: assessment.score,
            processing_time: started.elapsed().as_secs_f64(),
            language_code: declared.code().to_string(),
            model_used: self.generator.model_name(family).to_string(),
            model_family: family.label().to_string(),
        };

        // Stage 9: cache write, best-effort. Rejected answers are not
        // cached; a replacement message is not a reusable artifact.
        if !rejected {
            let write = self
                .staged(Stage::CacheWrite, budgets.cache_write_ms, deadline, cancel, async {
                    self.cache
                        .store_outcome(declared.code(), family, &normalized, &outcome, &english_answer)
                        .await;
                    Ok(())
                })
                .await;
            match write {
                Ok(()) => {}
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => tracing::warn!(error = %e, "cache write skipped"),
            }
        }

        Ok(outcome)
    }

    /// Run a stage future under the smaller of its budget and the
    /// remaining request deadline, racing it against cancellation.
    async fn staged<T>(
        &self,
        stage: Stage,
        budget_ms: u64,
        deadline: Instant,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::UpstreamTimeout { stage });
        }
        let budget = Duration::from_millis(budget_ms).min(remaining);

        let call_started = Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(budget, fut) => match result {
                Ok(inner) => inner.map_err(|e| e.at_stage(stage)),
                Err(_) => {
                    tracing::warn!(
                        stage = %stage,
                        elapsed_ms = call_started.elapsed().as_millis() as u64,
                        "stage exceeded its budget"
                    );
                    Err(Error::UpstreamTimeout { stage })
                }
            },
        }
    }
}

fn validate(request: &QueryRequest, max_history: usize) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(Error::InputInvalid("Query cannot be empty".to_string()));
    }
    let length = request.query.chars().count();
    if length > 2000 {
        return Err(Error::InputInvalid(
            "Query is too long (maximum 2000 characters)".to_string(),
        ));
    }
    if request.history.len() > max_history {
        return Err(Error::InputInvalid(format!(
            "Conversation history is too long (maximum {max_history} messages)"
        )));
    }
    Ok(())
}

fn report(progress: &Option<ProgressSender>, stage: &str) {
    if let Some(sender) = progress {
        let (name, pct) = schedule(stage);
        sender.send(name, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_agent_core::Message;

    fn request(query: &str) -> QueryRequest {
        QueryRequest::new(query, "en")
    }

    #[test]
    fn test_validate_length_boundaries() {
        assert!(validate(&request("x"), 50).is_ok());
        assert!(validate(&request(&"x".repeat(2000)), 50).is_ok());
        assert!(validate(&request(&"x".repeat(2001)), 50).is_err());
        assert!(validate(&request(""), 50).is_err());
        assert!(validate(&request("   "), 50).is_err());
    }

    #[test]
    fn test_validate_history_bound() {
        let mut req = request("q");
        req.history = (0..51).map(|i| Message::user(format!("m{i}"))).collect();
        assert!(validate(&req, 50).is_err());
        req.history.truncate(50);
        assert!(validate(&req, 50).is_ok());
    }

    #[test]
    fn test_schedule_is_monotonic() {
        let pcts: Vec<f32> = PROGRESS_SCHEDULE.iter().map(|(_, pct)| *pct).collect();
        assert!(pcts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*pcts.last().unwrap(), 1.0);
    }

    #[test]
    fn test_schedule_lookup_unknown_maps_to_complete() {
        assert_eq!(schedule("NotAStage"), ("Complete", 1.0));
    }
}
