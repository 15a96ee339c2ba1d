//! Recent-query index entries and fuzzy matching
//!
//! The recent list holds `"<cache_key>|<normalized_query>|<lang>"` records,
//! most-recent first. Fuzzy matching only ever compares entries in the same
//! language.

/// One record in the recent-query index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub key: String,
    pub normalized: String,
    pub lang: String,
}

impl RecentEntry {
    pub fn new(key: impl Into<String>, normalized: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            normalized: normalized.into(),
            lang: lang.into(),
        }
    }

    /// Serialize as `key|normalized|lang`
    pub fn encode(&self) -> String {
        format!("{}|{}|{}", self.key, self.normalized, self.lang)
    }

    /// Parse a record. Two-field records (written before language scoping)
    /// default to English.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, '|');
        let key = parts.next()?.to_string();
        let normalized = parts.next()?.to_string();
        let lang = parts.next().unwrap_or("en").to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self { key, normalized, lang })
    }
}

/// Jaccard similarity over whitespace-split token sets.
///
/// Tokens are compared with surrounding punctuation stripped, so
/// "climate change?" and "climate change" count as the same tokens.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let inter = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    inter as f32 / union as f32
}

fn token_set(text: &str) -> std::collections::HashSet<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Find the best same-language near-duplicate of `normalized`.
///
/// Identical normalized strings count as 1.0 and take precedence over any
/// token-set similarity.
pub fn best_match<'a>(
    entries: &'a [RecentEntry],
    normalized: &str,
    lang: &str,
) -> Option<(&'a RecentEntry, f32)> {
    let mut best: Option<(&RecentEntry, f32)> = None;

    for entry in entries.iter().filter(|e| e.lang == lang) {
        let sim = if entry.normalized == normalized {
            1.0
        } else {
            jaccard(&entry.normalized, normalized)
        };
        if best.map_or(true, |(_, score)| sim > score) {
            best = Some((entry, sim));
        }
    }

    best
}
