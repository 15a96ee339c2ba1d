//! Faithfulness guard
//!
//! Scores the generated answer against its retrieval contexts and
//! classifies the result. A failing scorer yields a conservative default
//! score marked degraded, so scorer outages surface as low-confidence
//! answers instead of blocking users.

use std::sync::Arc;

use climate_agent_core::FaithfulnessScorer;

/// Replacement response when an answer fails verification outright
pub const DEGRADED_RESPONSE_MESSAGE: &str =
    "I wasn't able to verify this answer against trusted sources well enough to share it \
     confidently. Please try rephrasing your question, and check the cited sources directly.";

/// Score substituted when the scoring capability fails or times out
pub const FALLBACK_SCORE: f32 = 0.3;

/// How an answer fared against its contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaithfulnessVerdict {
    /// Supported by the contexts; return as-is
    Faithful,
    /// Weakly supported; return with a warning logged
    Degraded,
    /// Unsupported; replace the response, keep the citations
    Rejected,
}

/// Guard output
#[derive(Debug, Clone, Copy)]
pub struct Assessment {
    pub score: f32,
    pub verdict: FaithfulnessVerdict,
}

/// Threshold-based faithfulness guard over an injected scorer
pub struct FaithfulnessGuard {
    scorer: Arc<dyn FaithfulnessScorer>,
    threshold: f32,
    degraded_floor: f32,
}

impl FaithfulnessGuard {
    pub fn new(scorer: Arc<dyn FaithfulnessScorer>, threshold: f32, degraded_floor: f32) -> Self {
        Self {
            scorer,
            threshold,
            degraded_floor,
        }
    }

    /// Score an answer and classify it. Never fails: scorer errors return
    /// the fallback score marked `Degraded`.
    pub async fn assess(&self, question: &str, answer: &str, contexts: &[String]) -> Assessment {
        match self.scorer.score(question, answer, contexts).await {
            Ok(score) => {
                let score = score.clamp(0.0, 1.0);
                let verdict = self.classify(score);
                if verdict != FaithfulnessVerdict::Faithful {
                    tracing::warn!(score, threshold = self.threshold, "answer faithfulness below threshold");
                }
                Assessment { score, verdict }
            }
            Err(e) => {
                tracing::warn!(error = %e, "faithfulness scoring failed, marking result low-confidence");
                Assessment {
                    score: FALLBACK_SCORE,
                    verdict: FaithfulnessVerdict::Degraded,
                }
            }
        }
    }

    fn classify(&self, score: f32) -> FaithfulnessVerdict {
        if score >= self.threshold {
            FaithfulnessVerdict::Faithful
        } else if score >= self.degraded_floor {
            FaithfulnessVerdict::Degraded
        } else {
            FaithfulnessVerdict::Rejected
        }
    }
}
