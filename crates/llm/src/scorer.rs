//! LLM-backed faithfulness scoring
//!
//! Asks a classifier-capable model to rate answer supportedness on a 0-100
//! scale and maps it into `[0, 1]`. The guard in the pipeline crate handles
//! failures; this scorer just reports them.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use climate_agent_core::{ClassifierModel, Error, FaithfulnessScorer, Result};

use crate::prompt::faithfulness_prompt;

static SCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,3}").expect("static regex"));

/// Scores faithfulness with a lightweight LLM call
pub struct LlmFaithfulnessScorer {
    model: Arc<dyn ClassifierModel>,
    /// How many contexts to include in the scoring prompt
    max_contexts: usize,
}

impl LlmFaithfulnessScorer {
    pub fn new(model: Arc<dyn ClassifierModel>) -> Self {
        Self {
            model,
            max_contexts: 5,
        }
    }
}

#[async_trait]
impl FaithfulnessScorer for LlmFaithfulnessScorer {
    async fn score(&self, question: &str, answer: &str, contexts: &[String]) -> Result<f32> {
        if contexts.is_empty() {
            return Err(Error::Model("no contexts to score against".to_string()));
        }

        let limited: Vec<String> = contexts.iter().take(self.max_contexts).cloned().collect();
        let prompt = faithfulness_prompt(question, answer, &limited);
        let raw = self
            .model
            .generate_structured(&prompt, "You grade how well answers are supported by source texts.")
            .await?;

        let value: u32 = SCORE_RE
            .find(&raw)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| Error::Model(format!("unparseable faithfulness score: {raw:?}")))?;

        Ok((value.min(100) as f32) / 100.0)
    }
}
