//! Language router
//!
//! Decides whether a request proceeds, which model family serves it, and
//! whether translation is required. Detection is heuristic and never
//! fails: scripts give a definite answer, Latin-script languages are
//! scored by stopword hits, and ambiguity resolves to "unknown" which
//! lets the request through without a mismatch.

use climate_agent_core::{Language, RoutingVerdict, Script};

/// Refusal shown when the utterance language contradicts a declared
/// English UI language
pub const LANGUAGE_MISMATCH_MESSAGE: &str =
    "Whoops! You wrote in a different language than the one you selected. Please choose the \
     language you want me to respond in on the side panel so I can ensure the best translation \
     for you!";

/// Common English short tokens that would otherwise be too short for
/// stopword scoring
const ENGLISH_GREETINGS: &[&str] = &[
    " hello ", " hi ", " hey ", " thanks ", " thank you ", " goodbye ", " bye ",
];

/// Stopword cue sets for Latin-script languages, scored by hit count
const LATIN_STOPWORDS: &[(Language, &[&str])] = &[
    (Language::English, &[" the ", " and ", " what ", " is ", " of ", " to ", " in "]),
    (
        Language::Spanish,
        &[" el ", " la ", " los ", " las ", " de ", " del ", " que ", " por ", " para ", " es ", " qué "],
    ),
    (
        Language::French,
        &[" le ", " la ", " les ", " des ", " du ", " est ", " que ", " pour ", " avec ", " sur "],
    ),
    (
        Language::German,
        &[" der ", " die ", " das ", " und ", " ist ", " nicht ", " mit ", " auf "],
    ),
    (
        Language::Italian,
        &[" il ", " lo ", " la ", " gli ", " le ", " che ", " per ", " con ", " non ", " è "],
    ),
    (
        Language::Portuguese,
        &[" o ", " a ", " os ", " as ", " de ", " do ", " da ", " que ", " para ", " com ", " não "],
    ),
];

/// Minimum stopword hits before a Latin-language guess counts as definite
const MIN_STOPWORD_HITS: usize = 2;

/// Heuristic language router
#[derive(Debug, Default)]
pub struct LanguageRouter;

impl LanguageRouter {
    pub fn new() -> Self {
        Self
    }

    /// Lightweight language guess for mismatch checks.
    ///
    /// Returns a definite language or `None` when unsure. Never fails.
    pub fn detect_language(&self, text: &str) -> Option<Language> {
        if text.trim().is_empty() {
            return None;
        }

        let padded = format!(" {} ", text.to_lowercase());

        // Short English greetings defeat stopword scoring, so whitelist them
        if ENGLISH_GREETINGS.iter().any(|token| padded.contains(token)) {
            return Some(Language::English);
        }

        // Non-Latin scripts identify a language outright
        match Script::detect(text) {
            Some(Script::Latin) => {}
            Some(script) => return script.definite_language(),
            None => return None,
        }

        let mut best: Option<(Language, usize)> = None;
        for (language, stopwords) in LATIN_STOPWORDS {
            let hits = stopwords.iter().filter(|w| padded.contains(*w)).count();
            if best.map_or(true, |(_, best_hits)| hits > best_hits) {
                best = Some((*language, hits));
            }
        }

        best.filter(|(_, hits)| *hits >= MIN_STOPWORD_HITS)
            .map(|(language, _)| language)
    }

    /// Produce the routing verdict for an utterance.
    ///
    /// Policy is asymmetric: a definite non-English detection under a
    /// declared English UI refuses outright, while a disagreeing detection
    /// under a non-English UI proceeds with the mismatch flagged so
    /// downstream stages can still translate.
    pub fn route(&self, query: &str, declared: Language) -> RoutingVerdict {
        let family = declared.family();
        let needs_translation = declared != Language::English;
        let detected = self.detect_language(query);

        tracing::info!(
            declared = declared.code(),
            detected = ?detected.map(|l| l.code()),
            family = %family,
            "routing verdict"
        );

        match detected {
            Some(found) if found != declared => {
                if declared == Language::English {
                    RoutingVerdict {
                        should_proceed: false,
                        family,
                        needs_translation,
                        language_mismatch: true,
                        detected,
                        message: Some(LANGUAGE_MISMATCH_MESSAGE.to_string()),
                        processed_query: query.to_string(),
                        english_query: query.to_string(),
                    }
                } else {
                    RoutingVerdict {
                        should_proceed: true,
                        family,
                        needs_translation,
                        language_mismatch: true,
                        detected,
                        message: Some(format!(
                            "Detected {} text while language selected is {}. You can switch the \
                             language in the sidebar.",
                            found.name(),
                            declared.name()
                        )),
                        processed_query: query.to_string(),
                        english_query: query.to_string(),
                    }
                }
            }
            _ => RoutingVerdict {
                should_proceed: true,
                family,
                needs_translation,
                language_mismatch: false,
                detected,
                message: None,
                processed_query: query.to_string(),
                english_query: query.to_string(),
            },
        }
    }
}
