//! Language registry for the multilingual climate agent
//!
//! A closed registry of supported languages. Each language carries its
//! ISO 639-1 code, a human-readable name, and the response-model family
//! that serves it. Region variants (`zh-cn`, `pt-br`, ...) are collapsed
//! by [`Language::normalize_code`] before lookup.

use serde::{Deserialize, Serialize};

/// Response-model family serving a language.
///
/// Two interchangeable backends exist; the registry decides which one a
/// request is dispatched to. English always routes to `Primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    Primary,
    Secondary,
}

impl ModelFamily {
    /// Stable label used in cache keys and result records
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Dutch,
    Russian,
    Chinese,
    Japanese,
    Korean,
    Arabic,
    Hindi,
    Bengali,
    Urdu,
    Tamil,
    Gujarati,
    Persian,
    Vietnamese,
    Thai,
    Turkish,
    Polish,
    Czech,
    Hungarian,
    Romanian,
    Greek,
    Hebrew,
    Ukrainian,
    Indonesian,
    Filipino,
    Danish,
    Swedish,
    Norwegian,
    Finnish,
    Bulgarian,
    Slovak,
    Slovenian,
    Estonian,
    Latvian,
    Lithuanian,
}

impl Language {
    /// Get ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
            Self::Italian => "it",
            Self::Portuguese => "pt",
            Self::Dutch => "nl",
            Self::Russian => "ru",
            Self::Chinese => "zh",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::Arabic => "ar",
            Self::Hindi => "hi",
            Self::Bengali => "bn",
            Self::Urdu => "ur",
            Self::Tamil => "ta",
            Self::Gujarati => "gu",
            Self::Persian => "fa",
            Self::Vietnamese => "vi",
            Self::Thai => "th",
            Self::Turkish => "tr",
            Self::Polish => "pl",
            Self::Czech => "cs",
            Self::Hungarian => "hu",
            Self::Romanian => "ro",
            Self::Greek => "el",
            Self::Hebrew => "he",
            Self::Ukrainian => "uk",
            Self::Indonesian => "id",
            Self::Filipino => "tl",
            Self::Danish => "da",
            Self::Swedish => "sv",
            Self::Norwegian => "no",
            Self::Finnish => "fi",
            Self::Bulgarian => "bg",
            Self::Slovak => "sk",
            Self::Slovenian => "sl",
            Self::Estonian => "et",
            Self::Latvian => "lv",
            Self::Lithuanian => "lt",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Italian => "Italian",
            Self::Portuguese => "Portuguese",
            Self::Dutch => "Dutch",
            Self::Russian => "Russian",
            Self::Chinese => "Chinese",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
            Self::Arabic => "Arabic",
            Self::Hindi => "Hindi",
            Self::Bengali => "Bengali",
            Self::Urdu => "Urdu",
            Self::Tamil => "Tamil",
            Self::Gujarati => "Gujarati",
            Self::Persian => "Persian",
            Self::Vietnamese => "Vietnamese",
            Self::Thai => "Thai",
            Self::Turkish => "Turkish",
            Self::Polish => "Polish",
            Self::Czech => "Czech",
            Self::Hungarian => "Hungarian",
            Self::Romanian => "Romanian",
            Self::Greek => "Greek",
            Self::Hebrew => "Hebrew",
            Self::Ukrainian => "Ukrainian",
            Self::Indonesian => "Indonesian",
            Self::Filipino => "Filipino",
            Self::Danish => "Danish",
            Self::Swedish => "Swedish",
            Self::Norwegian => "Norwegian",
            Self::Finnish => "Finnish",
            Self::Bulgarian => "Bulgarian",
            Self::Slovak => "Slovak",
            Self::Slovenian => "Slovenian",
            Self::Estonian => "Estonian",
            Self::Latvian => "Latvian",
            Self::Lithuanian => "Lithuanian",
        }
    }

    /// Response-model family serving this language.
    ///
    /// The secondary family covers the languages its backend supports
    /// natively; everything else, English included, goes to the primary
    /// family, which handles arbitrary languages via translation.
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::Arabic
            | Self::Bengali
            | Self::Chinese
            | Self::Filipino
            | Self::French
            | Self::Gujarati
            | Self::Korean
            | Self::Persian
            | Self::Russian
            | Self::Tamil
            | Self::Urdu
            | Self::Vietnamese
            | Self::Polish
            | Self::Turkish
            | Self::Dutch
            | Self::Czech
            | Self::Indonesian
            | Self::Ukrainian
            | Self::Romanian
            | Self::Greek
            | Self::Hindi
            | Self::Hebrew => ModelFamily::Secondary,
            _ => ModelFamily::Primary,
        }
    }

    /// Collapse region variants and lowercase a raw language code.
    ///
    /// `zh-CN` becomes `zh`, `pt-br` becomes `pt`, and so on. Codes with
    /// no variant entry are returned lowercased unchanged.
    pub fn normalize_code(raw: &str) -> String {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "zh-cn" | "zh-tw" => "zh",
            "pt-br" | "pt-pt" => "pt",
            "en-us" | "en-gb" => "en",
            "fr-ca" | "fr-fr" => "fr",
            "es-es" | "es-mx" | "es-ar" => "es",
            "de-de" | "de-at" | "de-ch" => "de",
            "nl-nl" | "nl-be" => "nl",
            "it-it" | "it-ch" => "it",
            "sv-se" | "sv-fi" => "sv",
            "no-no" => "no",
            "da-dk" => "da",
            "fi-fi" => "fi",
            "he-il" => "he",
            "ar-sa" | "ar-eg" => "ar",
            "ru-ru" => "ru",
            "pl-pl" => "pl",
            "ja-jp" => "ja",
            "ko-kr" => "ko",
            "vi-vn" => "vi",
            "id-id" => "id",
            "th-th" => "th",
            "tr-tr" => "tr",
            "uk-ua" => "uk",
            "bg-bg" => "bg",
            "cs-cz" => "cs",
            "hu-hu" => "hu",
            "ro-ro" => "ro",
            "sk-sk" => "sk",
            "sl-si" => "sl",
            "tl-ph" => "tl",
            "gu-in" => "gu",
            "bn-bd" => "bn",
            "ta-in" => "ta",
            "ur-pk" => "ur",
            "fa-ir" => "fa",
            other => return other.to_string(),
        }
        .to_string()
    }

    /// Look up a language by code, collapsing region variants first
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = Self::normalize_code(code);
        Self::all().iter().copied().find(|l| l.code() == normalized)
    }

    /// Parse from a code or an English language name (case-insensitive)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        if let Some(lang) = Self::from_code(s) {
            return Some(lang);
        }
        let lower = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|l| l.name().to_lowercase() == lower)
    }

    /// Get all supported languages
    pub fn all() -> &'static [Language] {
        &[
            Self::English,
            Self::Spanish,
            Self::French,
            Self::German,
            Self::Italian,
            Self::Portuguese,
            Self::Dutch,
            Self::Russian,
            Self::Chinese,
            Self::Japanese,
            Self::Korean,
            Self::Arabic,
            Self::Hindi,
            Self::Bengali,
            Self::Urdu,
            Self::Tamil,
            Self::Gujarati,
            Self::Persian,
            Self::Vietnamese,
            Self::Thai,
            Self::Turkish,
            Self::Polish,
            Self::Czech,
            Self::Hungarian,
            Self::Romanian,
            Self::Greek,
            Self::Hebrew,
            Self::Ukrainian,
            Self::Indonesian,
            Self::Filipino,
            Self::Danish,
            Self::Swedish,
            Self::Norwegian,
            Self::Finnish,
            Self::Bulgarian,
            Self::Slovak,
            Self::Slovenian,
            Self::Estonian,
            Self::Latvian,
            Self::Lithuanian,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Script systems checked by the language detection heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Han,
    Kana,
    Hangul,
    Arabic,
    Hebrew,
    Cyrillic,
    Devanagari,
    Greek,
    Thai,
}

impl Script {
    /// Unicode ranges for this script
    pub fn unicode_ranges(&self) -> &'static [(u32, u32)] {
        match self {
            Self::Latin => &[(0x0041, 0x005A), (0x0061, 0x007A)],
            Self::Han => &[(0x4E00, 0x9FFF)],
            Self::Kana => &[(0x3040, 0x309F), (0x30A0, 0x30FF)],
            Self::Hangul => &[(0xAC00, 0xD7AF)],
            Self::Arabic => &[(0x0600, 0x06FF)],
            Self::Hebrew => &[(0x0590, 0x05FF)],
            Self::Cyrillic => &[(0x0400, 0x04FF)],
            Self::Devanagari => &[(0x0900, 0x097F)],
            Self::Greek => &[(0x0370, 0x03FF)],
            Self::Thai => &[(0x0E00, 0x0E7F)],
        }
    }

    /// Check if a character belongs to this script
    pub fn contains_char(&self, c: char) -> bool {
        let code = c as u32;
        self.unicode_ranges()
            .iter()
            .any(|(start, end)| code >= *start && code <= *end)
    }

    /// Detect the first non-Latin script present in the text, else Latin
    /// when any Latin letter appears.
    ///
    /// Kana is checked before Han so Japanese text mixing kana and kanji
    /// resolves to Japanese; pure-kanji text resolves to Chinese.
    pub fn detect(text: &str) -> Option<Self> {
        const ORDER: &[Script] = &[
            Script::Kana,
            Script::Han,
            Script::Hangul,
            Script::Arabic,
            Script::Hebrew,
            Script::Cyrillic,
            Script::Devanagari,
            Script::Greek,
            Script::Thai,
        ];

        for script in ORDER {
            if text.chars().any(|c| script.contains_char(c)) {
                return Some(*script);
            }
        }

        if text.chars().any(|c| Script::Latin.contains_char(c)) {
            return Some(Script::Latin);
        }
        None
    }

    /// The single language a non-Latin script maps to, if unambiguous
    /// within the registry.
    pub fn definite_language(&self) -> Option<Language> {
        match self {
            Self::Han => Some(Language::Chinese),
            Self::Kana => Some(Language::Japanese),
            Self::Hangul => Some(Language::Korean),
            Self::Arabic => Some(Language::Arabic),
            Self::Hebrew => Some(Language::Hebrew),
            Self::Cyrillic => Some(Language::Russian),
            Self::Devanagari => Some(Language::Hindi),
            Self::Greek => Some(Language::Greek),
            Self::Thai => Some(Language::Thai),
            Self::Latin => None,
        }
    }
}
