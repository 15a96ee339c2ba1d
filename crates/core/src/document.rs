//! Retrieved documents and citations
//!
//! `content` is the authoritative field; `snippet` is derived from it.
//! Documents are created by the retriever, preprocessed once, and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Maximum snippet length in grapheme clusters
const SNIPPET_LEN: usize = 200;

/// Minimum content length for a document to be kept
const MIN_CONTENT_LEN: usize = 10;

/// A retrieved document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub url: String,
    pub content: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    /// Create a document, deriving the snippet from content
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let snippet = make_snippet(&content);
        Self {
            title: title.into(),
            url: url.into(),
            content,
            snippet,
            score: None,
        }
    }

    /// Attach a relevance score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// A document projection returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    pub content: String,
    pub snippet: String,
}

impl From<&Document> for Citation {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            url: doc.url.clone(),
            content: doc.content.clone(),
            snippet: doc.snippet.clone(),
        }
    }
}

/// First ~200 graphemes of the content, with an ellipsis when truncated
pub fn make_snippet(content: &str) -> String {
    let graphemes: Vec<&str> = content.graphemes(true).collect();
    if graphemes.len() > SNIPPET_LEN {
        let mut snippet: String = graphemes[..SNIPPET_LEN].concat();
        snippet.push_str("...");
        snippet
    } else {
        content.to_string()
    }
}

/// Normalize a batch of retrieved documents.
///
/// Cleans escaped whitespace/quotes out of content, drops documents with an
/// empty title or content shorter than 10 characters, deduplicates by title
/// (first occurrence wins), and rebuilds snippets.
pub fn preprocess_documents(docs: Vec<Document>) -> Vec<Document> {
    let mut seen_titles = std::collections::HashSet::new();
    let mut kept = Vec::with_capacity(docs.len());

    for doc in docs {
        let title = doc.title.trim().to_string();
        let content = doc
            .content
            .replace("\\n", " ")
            .replace("\\\"", "\"")
            .trim()
            .to_string();

        if title.is_empty() {
            tracing::warn!("dropping document without title");
            continue;
        }
        if content.chars().count() < MIN_CONTENT_LEN {
            tracing::warn!(title = %title, "dropping document with too little content");
            continue;
        }
        if !seen_titles.insert(title.clone()) {
            continue;
        }

        let snippet = make_snippet(&content);
        kept.push(Document {
            title,
            url: doc.url,
            content,
            snippet,
            score: doc.score,
        });
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_short_content_unchanged() {
        assert_eq!(make_snippet("short"), "short");
    }

    #[test]
    fn test_snippet_truncates_with_ellipsis() {
        let long = "x".repeat(300);
        let snippet = make_snippet(&long);
        assert_eq!(snippet.chars().count(), 203);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_preprocess_drops_missing_title() {
        let docs = vec![Document::new("", "http://a", "long enough content here")];
        assert!(preprocess_documents(docs).is_empty());
    }

    #[test]
    fn test_preprocess_drops_short_content() {
        let docs = vec![Document::new("Title", "http://a", "tiny")];
        assert!(preprocess_documents(docs).is_empty());
    }

    #[test]
    fn test_preprocess_keeps_content_of_exactly_ten_chars() {
        let docs = vec![Document::new("Title", "http://a", "0123456789")];
        assert_eq!(preprocess_documents(docs).len(), 1);
    }

    #[test]
    fn test_preprocess_dedups_by_title() {
        let docs = vec![
            Document::new("Same", "http://a", "first version of the content"),
            Document::new("Same", "http://b", "second version of the content"),
            Document::new("Other", "http://c", "a different document entirely"),
        ];
        let kept = preprocess_documents(docs);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].url, "http://a");
    }

    #[test]
    fn test_preprocess_cleans_escapes() {
        let docs = vec![Document::new("T", "", r#"line\none \"quoted\" text"#)];
        let kept = preprocess_documents(docs);
        assert_eq!(kept[0].content, r#"line one "quoted" text"#);
    }

    #[test]
    fn test_citation_projection() {
        let doc = Document::new("T", "http://a", "some reasonably long content").with_score(0.9);
        let citation = Citation::from(&doc);
        assert_eq!(citation.title, "T");
        assert_eq!(citation.snippet, doc.snippet);
    }
}
