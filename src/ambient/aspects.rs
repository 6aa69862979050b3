//! Value types stored in the ambient slots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language configured on a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLanguage {
    /// Numeric language id (0 is the site default by convention).
    pub language_id: u32,
    /// Two-letter ISO 639-1 code.
    pub iso_code: String,
    /// Human-readable title.
    pub title: String,
    /// Locale used for rendering, e.g. `de_DE.UTF-8`.
    pub locale: String,
    /// Language ids consulted when content is missing in this language.
    #[serde(default)]
    pub fallbacks: Vec<u32>,
}

impl SiteLanguage {
    /// Create a language without fallbacks.
    #[must_use]
    pub fn new(
        language_id: u32,
        iso_code: impl Into<String>,
        title: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            language_id,
            iso_code: iso_code.into(),
            title: title.into(),
            locale: locale.into(),
            fallbacks: Vec::new(),
        }
    }

    /// Set the fallback chain.
    #[must_use]
    pub fn with_fallbacks(mut self, fallbacks: Vec<u32>) -> Self {
        self.fallbacks = fallbacks;
        self
    }
}

/// A configured site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Unique site identifier.
    pub identifier: String,
    /// Root page of the site's page tree.
    pub root_page_id: u32,
    /// Configured languages, default language first.
    pub languages: Vec<SiteLanguage>,
}

impl Site {
    /// Create a site.
    #[must_use]
    pub fn new(identifier: impl Into<String>, root_page_id: u32, languages: Vec<SiteLanguage>) -> Self {
        Self {
            identifier: identifier.into(),
            root_page_id,
            languages,
        }
    }

    /// The site's default language: id 0 if configured, else the first one.
    #[must_use]
    pub fn default_language(&self) -> Option<&SiteLanguage> {
        self.language(0).or_else(|| self.languages.first())
    }

    /// Look up a configured language by id.
    #[must_use]
    pub fn language(&self, language_id: u32) -> Option<&SiteLanguage> {
        self.languages.iter().find(|l| l.language_id == language_id)
    }
}

/// The active language aspect: which language is requested and how content
/// falls back when a translation is missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageAspect {
    /// Requested language id.
    pub language_id: u32,
    /// Language id content is read in.
    pub content_id: u32,
    /// Fallback chain for missing translations.
    pub fallback_chain: Vec<u32>,
}

impl LanguageAspect {
    /// Build the aspect for a site language.
    #[must_use]
    pub fn for_language(language: &SiteLanguage) -> Self {
        Self {
            language_id: language.language_id,
            content_id: language.language_id,
            fallback_chain: language.fallbacks.clone(),
        }
    }
}

impl Default for LanguageAspect {
    fn default() -> Self {
        Self {
            language_id: 0,
            content_id: 0,
            fallback_chain: Vec::new(),
        }
    }
}

/// Translation service bound to one language key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageService {
    key: String,
}

impl LanguageService {
    /// Create a service for a language key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Create a service for a site language (keyed by its ISO code).
    #[must_use]
    pub fn for_language(language: &SiteLanguage) -> Self {
        Self::new(language.iso_code.to_ascii_lowercase())
    }

    /// The language key labels are looked up with.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Record visibility rules applied by queries.
///
/// Swapped as a whole; never updated field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityAspect {
    /// Include pages flagged hidden.
    pub include_hidden_pages: bool,
    /// Include content elements flagged hidden.
    pub include_hidden_content: bool,
    /// Include soft-deleted records.
    pub include_deleted_records: bool,
}

/// Numeric user id in the user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The acting user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// User id.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Whether the identity bypasses permission checks.
    pub is_admin: bool,
}
