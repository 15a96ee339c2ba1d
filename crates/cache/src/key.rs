//! Cache key discipline
//!
//! Keys take the form `q:<lang>:<sha256(<lang>:<family>:<normalized>)>`.
//! The language code appears both as a key prefix and inside the hashed
//! material: two languages must never collide on a key, even for an
//! identical normalized query.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use climate_agent_core::ModelFamily;

/// Normalize text for cache keys and fuzzy matching.
///
/// Lowercase, collapse runs of whitespace, trim. No stemming, no accent
/// folding. Idempotent.
pub fn normalize_query(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A computed cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a normalized query in a given language/family
    pub fn new(lang: &str, family: ModelFamily, normalized_query: &str) -> Self {
        let material = format!("{}:{}:{}", lang, family.label(), normalized_query);
        let digest = Sha256::digest(material.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            // infallible for String
            let _ = write!(hex, "{byte:02x}");
        }
        Self(format!("q:{lang}:{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_collapses() {
        assert_eq!(normalize_query("  What   CAUSES\tclimate change? "), "what causes climate change?");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_query("  Mixed   CASE  input ");
        assert_eq!(normalize_query(&once), once);
    }

    #[test]
    fn test_key_shape() {
        let key = CacheKey::new("en", ModelFamily::Primary, "what causes climate change?");
        assert!(key.as_str().starts_with("q:en:"));
        // prefix + 64 hex chars
        assert_eq!(key.as_str().len(), "q:en:".len() + 64);
    }

    #[test]
    fn test_language_scopes_keys() {
        let q = "what causes climate change?";
        let en = CacheKey::new("en", ModelFamily::Primary, q);
        let es = CacheKey::new("es", ModelFamily::Primary, q);
        assert_ne!(en, es);
    }

    #[test]
    fn test_family_scopes_keys() {
        let q = "what causes climate change?";
        let primary = CacheKey::new("fr", ModelFamily::Primary, q);
        let secondary = CacheKey::new("fr", ModelFamily::Secondary, q);
        assert_ne!(primary, secondary);
    }

    #[test]
    fn test_same_inputs_same_key() {
        let a = CacheKey::new("en", ModelFamily::Primary, "q");
        let b = CacheKey::new("en", ModelFamily::Primary, "q");
        assert_eq!(a, b);
    }
}
