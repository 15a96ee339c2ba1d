//! Language model capability traits

use async_trait::async_trait;

use crate::conversation::Message;
use crate::document::Document;
use crate::Result;

/// Classifier/rewriter model.
///
/// Returns a line-delimited structured block which the classifier adapter
/// parses into a verdict. Also used for lightweight scoring calls
/// (conversation-history relevance).
#[async_trait]
pub trait ClassifierModel: Send + Sync + 'static {
    /// Run a structured prompt and return the raw response text
    async fn generate_structured(&self, prompt: &str, system: &str) -> Result<String>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Response model, one implementation per family.
///
/// Answers are always generated in English; translation to the declared
/// language happens downstream. Implementations serialize the history into
/// their backend's native chat shape.
#[async_trait]
pub trait ResponseModel: Send + Sync + 'static {
    /// Generate a grounded answer from the query and documents
    async fn generate_answer(
        &self,
        query: &str,
        docs: &[Document],
        system: &str,
        history: &[Message],
    ) -> Result<String>;

    /// Model name for logging and result records
    fn model_name(&self) -> &str;
}

/// Scores how well an answer is supported by the retrieved contexts.
///
/// Returns a value in `[0, 1]`. Failures are handled by the faithfulness
/// guard, which substitutes a conservative default instead of blocking the
/// request.
#[async_trait]
pub trait FaithfulnessScorer: Send + Sync + 'static {
    async fn score(&self, question: &str, answer: &str, contexts: &[String]) -> Result<f32>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct MockClassifier;

    #[async_trait]
    impl ClassifierModel for MockClassifier {
        async fn generate_structured(&self, _prompt: &str, _system: &str) -> Result<String> {
            Ok("Language: en\nClassification: on-topic\nLanguageMatch: yes\nRewritten: N/A".to_string())
        }

        fn model_name(&self) -> &str {
            "mock-classifier"
        }
    }

    struct MockResponder;

    #[async_trait]
    impl ResponseModel for MockResponder {
        async fn generate_answer(
            &self,
            _query: &str,
            docs: &[Document],
            _system: &str,
            _history: &[Message],
        ) -> Result<String> {
            if docs.is_empty() {
                return Err(Error::Model("no documents".to_string()));
            }
            Ok("Mock answer".to_string())
        }

        fn model_name(&self) -> &str {
            "mock-responder"
        }
    }

    #[tokio::test]
    async fn test_mock_classifier() {
        let model = MockClassifier;
        let raw = model.generate_structured("q", "s").await.unwrap();
        assert!(raw.contains("on-topic"));
        assert_eq!(model.model_name(), "mock-classifier");
    }

    #[tokio::test]
    async fn test_mock_responder() {
        let model = MockResponder;
        let docs = vec![Document::new("T", "", "long enough content here")];
        let answer = model.generate_answer("q", &docs, "sys", &[]).await.unwrap();
        assert_eq!(answer, "Mock answer");
    }
}
