//! Translation capability

use async_trait::async_trait;

/// Text translator between two named languages.
///
/// The contract is infallible at the boundary: implementations must return
/// the input unchanged when translation fails, logging the cause
/// themselves. The pipeline treats an unchanged return as "best effort
/// done".
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translate `text` from `source_lang` to `target_lang` (human-readable
    /// language names, e.g. "Spanish")
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str, _source: &str, _target: &str) -> String {
            text.to_string()
        }
    }

    #[tokio::test]
    async fn test_echo_translator() {
        let translator = EchoTranslator;
        let out = translator.translate("hola", "Spanish", "English").await;
        assert_eq!(out, "hola");
    }
}
