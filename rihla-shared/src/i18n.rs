use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Languages content can be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    English,
    Arabic,
    French,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Arabic, Language::French];

    /// Column value used in the translations table.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "ENGLISH",
            Language::Arabic => "ARABIC",
            Language::French => "FRENCH",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "ar" | "arabic" => Ok(Language::Arabic),
            "fr" | "french" => Ok(Language::French),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// The translatable fields of a content entry in one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub title: String,
    pub excerpt: String,
    pub content: String,
}

impl LocalizedText {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.excerpt.is_empty() && self.content.is_empty()
    }
}

/// All translations of one entry, keyed by language.
///
/// Lookups go through [`TranslationMap::localized`], which falls back field by
/// field to a default language when the requested translation is blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationMap(BTreeMap<Language, LocalizedText>);

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, language: Language) -> Option<&LocalizedText> {
        self.0.get(&language)
    }

    pub fn set(&mut self, language: Language, text: LocalizedText) {
        self.0.insert(language, text);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Language, &LocalizedText)> {
        self.0.iter().map(|(lang, text)| (*lang, text))
    }

    /// Makes sure every supported language has a row, empty if never supplied.
    pub fn fill_missing(&mut self) {
        for language in Language::ALL {
            self.0.entry(language).or_default();
        }
    }

    pub fn localized(&self, language: Language, fallback: Language) -> LocalizedText {
        let requested = self.get(language).cloned().unwrap_or_default();
        if language == fallback {
            return requested;
        }
        let default = self.get(fallback).cloned().unwrap_or_default();

        let pick = |value: String, default: String| if value.trim().is_empty() { default } else { value };
        LocalizedText {
            title: pick(requested.title, default.title),
            excerpt: pick(requested.excerpt, default.excerpt),
            content: pick(requested.content, default.content),
        }
    }
}

impl FromIterator<(Language, LocalizedText)> for TranslationMap {
    fn from_iter<I: IntoIterator<Item = (Language, LocalizedText)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One field of a request payload, keyed by language code:
/// `{"en": "Desert tour", "ar": "...", "fr": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedField {
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub ar: Option<String>,
    #[serde(default)]
    pub fr: Option<String>,
}

impl LocalizedField {
    pub fn get(&self, language: Language) -> Option<&str> {
        match language {
            Language::English => self.en.as_deref(),
            Language::Arabic => self.ar.as_deref(),
            Language::French => self.fr.as_deref(),
        }
    }

    fn value_or_empty(&self, language: Language) -> String {
        self.get(language).unwrap_or_default().to_string()
    }
}

/// The translatable part of a create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedInput {
    #[serde(default)]
    pub title: Option<LocalizedField>,
    #[serde(default)]
    pub excerpt: Option<LocalizedField>,
    #[serde(default)]
    pub content: Option<LocalizedField>,
}

impl LocalizedInput {
    pub fn english_title(&self) -> Option<&str> {
        non_blank(self.title.as_ref().and_then(|f| f.get(Language::English)))
    }

    pub fn english_content(&self) -> Option<&str> {
        non_blank(self.content.as_ref().and_then(|f| f.get(Language::English)))
    }

    /// Builds a full map for a new entry. Languages that were not supplied get
    /// empty strings.
    pub fn to_translation_map(&self) -> TranslationMap {
        let mut map = TranslationMap::new();
        self.apply_to(&mut map);
        map.fill_missing();
        map
    }

    /// Overwrites the supplied fields in every language of `map`. Fields that
    /// are absent from the payload keep their current values.
    pub fn apply_to(&self, map: &mut TranslationMap) {
        for language in Language::ALL {
            let entry = map.0.entry(language).or_default();
            if let Some(title) = &self.title {
                entry.title = title.value_or_empty(language);
            }
            if let Some(excerpt) = &self.excerpt {
                entry.excerpt = excerpt.value_or_empty(language);
            }
            if let Some(content) = &self.content {
                entry.content = content.value_or_empty(language);
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
