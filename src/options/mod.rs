//! Caller-facing simulation options.
//!
//! Raw options are what a caller hands to [`Simulator::run`](crate::Simulator::run).
//! They are folded through an [`OptionSchema`] assembled from every registered
//! pass into an immutable [`SimulationRequest`].

pub mod request;
pub mod schema;

pub use request::SimulationRequest;
pub use schema::OptionSchema;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ambient::SiteLanguage;
use crate::error::ValidationError;

/// Every option the simulator recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    /// `targetPageId`
    TargetPageId,
    /// `targetSiteId`
    TargetSiteId,
    /// `language`
    Language,
    /// `fallbackLanguage`
    FallbackLanguage,
    /// `includeHiddenPages`
    IncludeHiddenPages,
    /// `includeHiddenContent`
    IncludeHiddenContent,
    /// `includeDeletedRecords`
    IncludeDeletedRecords,
    /// `actAsPrivilegedUser`
    ActAsPrivilegedUser,
    /// `bootstrapRenderContext`
    BootstrapRenderContext,
    /// `suppressChildSimulations`
    SuppressChildSimulations,
    /// `ignoreWhenAlreadyNested`
    IgnoreWhenAlreadyNested,
    /// `ignoreWhenRenderContextExists`
    IgnoreWhenRenderContextExists,
}

impl OptionKey {
    /// The option's name as it appears in option bags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetPageId => "targetPageId",
            Self::TargetSiteId => "targetSiteId",
            Self::Language => "language",
            Self::FallbackLanguage => "fallbackLanguage",
            Self::IncludeHiddenPages => "includeHiddenPages",
            Self::IncludeHiddenContent => "includeHiddenContent",
            Self::IncludeDeletedRecords => "includeDeletedRecords",
            Self::ActAsPrivilegedUser => "actAsPrivilegedUser",
            Self::BootstrapRenderContext => "bootstrapRenderContext",
            Self::SuppressChildSimulations => "suppressChildSimulations",
            Self::IgnoreWhenAlreadyNested => "ignoreWhenAlreadyNested",
            Self::IgnoreWhenRenderContextExists => "ignoreWhenRenderContextExists",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested language: numeric id, ISO code, or a concrete language object.
///
/// Strings made only of ASCII digits are read as ids, so `"1"` and `1` name
/// the same language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LanguageRef {
    /// Numeric language id.
    Id(u32),
    /// Two-letter ISO code, matched case-insensitively.
    Iso(String),
    /// Already-resolved language; used as is.
    Language(SiteLanguage),
}

impl fmt::Display for LanguageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Iso(code) => f.write_str(code),
            Self::Language(language) => write!(f, "{} ({})", language.iso_code, language.language_id),
        }
    }
}

impl From<u32> for LanguageRef {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl LanguageRef {
    /// Read a textual language reference: a numeric id or a code.
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = text.parse::<u32>() {
                return Self::Id(id);
            }
        }
        Self::Iso(text)
    }
}

impl From<&str> for LanguageRef {
    fn from(code: &str) -> Self {
        Self::parse(code)
    }
}

impl From<String> for LanguageRef {
    fn from(code: String) -> Self {
        Self::parse(code)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLanguageRef {
    Id(u32),
    Text(String),
    Language(SiteLanguage),
}

impl<'de> Deserialize<'de> for LanguageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawLanguageRef::deserialize(deserializer)? {
            RawLanguageRef::Id(id) => Self::Id(id),
            RawLanguageRef::Text(text) => Self::parse(text),
            RawLanguageRef::Language(language) => Self::Language(language),
        })
    }
}

impl From<SiteLanguage> for LanguageRef {
    fn from(language: SiteLanguage) -> Self {
        Self::Language(language)
    }
}

/// Language to try when the requested one does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackLanguage {
    /// The current site's default language (`"default"` in option bags).
    SiteDefault,
    /// A specific language.
    Language(LanguageRef),
}

const SITE_DEFAULT_KEYWORD: &str = "default";

impl fmt::Display for FallbackLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SiteDefault => f.write_str(SITE_DEFAULT_KEYWORD),
            Self::Language(language) => language.fmt(f),
        }
    }
}

impl From<LanguageRef> for FallbackLanguage {
    fn from(language: LanguageRef) -> Self {
        match language {
            LanguageRef::Iso(code) if code.eq_ignore_ascii_case(SITE_DEFAULT_KEYWORD) => {
                Self::SiteDefault
            }
            other => Self::Language(other),
        }
    }
}

impl From<u32> for FallbackLanguage {
    fn from(id: u32) -> Self {
        Self::Language(LanguageRef::Id(id))
    }
}

impl From<&str> for FallbackLanguage {
    fn from(code: &str) -> Self {
        LanguageRef::from(code).into()
    }
}

impl From<SiteLanguage> for FallbackLanguage {
    fn from(language: SiteLanguage) -> Self {
        Self::Language(LanguageRef::Language(language))
    }
}

impl Serialize for FallbackLanguage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::SiteDefault => serializer.serialize_str(SITE_DEFAULT_KEYWORD),
            Self::Language(language) => language.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FallbackLanguage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        LanguageRef::deserialize(deserializer).map(Self::from)
    }
}

/// Raw caller options. Unset fields take the defaults declared by the passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulationOptions {
    /// Page to simulate.
    pub target_page_id: Option<u32>,
    /// Site to simulate.
    pub target_site_id: Option<String>,
    /// Language to simulate.
    pub language: Option<LanguageRef>,
    /// Language to use when `language` does not resolve.
    pub fallback_language: Option<FallbackLanguage>,
    /// Show hidden pages.
    pub include_hidden_pages: Option<bool>,
    /// Show hidden content elements.
    pub include_hidden_content: Option<bool>,
    /// Show soft-deleted records.
    pub include_deleted_records: Option<bool>,
    /// Act as the privileged sentinel user.
    pub act_as_privileged_user: Option<bool>,
    /// Install a render context for the target page.
    pub bootstrap_render_context: Option<bool>,
    /// Make nested simulations defer to this one.
    pub suppress_child_simulations: Option<bool>,
    /// Skip simulation entirely when already inside one.
    pub ignore_when_already_nested: Option<bool>,
    /// Skip simulation entirely when a render context exists.
    pub ignore_when_render_context_exists: Option<bool>,
}

impl SimulationOptions {
    /// Empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON option bag.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::MalformedOptions {
            reason: e.to_string(),
        })
    }

    /// Keys the caller explicitly set.
    #[must_use]
    pub fn provided_keys(&self) -> Vec<OptionKey> {
        let present = [
            (OptionKey::TargetPageId, self.target_page_id.is_some()),
            (OptionKey::TargetSiteId, self.target_site_id.is_some()),
            (OptionKey::Language, self.language.is_some()),
            (OptionKey::FallbackLanguage, self.fallback_language.is_some()),
            (OptionKey::IncludeHiddenPages, self.include_hidden_pages.is_some()),
            (OptionKey::IncludeHiddenContent, self.include_hidden_content.is_some()),
            (OptionKey::IncludeDeletedRecords, self.include_deleted_records.is_some()),
            (OptionKey::ActAsPrivilegedUser, self.act_as_privileged_user.is_some()),
            (OptionKey::BootstrapRenderContext, self.bootstrap_render_context.is_some()),
            (OptionKey::SuppressChildSimulations, self.suppress_child_simulations.is_some()),
            (OptionKey::IgnoreWhenAlreadyNested, self.ignore_when_already_nested.is_some()),
            (
                OptionKey::IgnoreWhenRenderContextExists,
                self.ignore_when_render_context_exists.is_some(),
            ),
        ];
        present
            .into_iter()
            .filter_map(|(key, set)| set.then_some(key))
            .collect()
    }

    /// Set the target page.
    #[must_use]
    pub fn page(mut self, page_id: u32) -> Self {
        self.target_page_id = Some(page_id);
        self
    }

    /// Set the target site.
    #[must_use]
    pub fn site(mut self, identifier: impl Into<String>) -> Self {
        self.target_site_id = Some(identifier.into());
        self
    }

    /// Set the target language.
    #[must_use]
    pub fn language(mut self, language: impl Into<LanguageRef>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the fallback language.
    #[must_use]
    pub fn fallback_language(mut self, language: impl Into<FallbackLanguage>) -> Self {
        self.fallback_language = Some(language.into());
        self
    }

    /// Show hidden pages.
    #[must_use]
    pub fn include_hidden_pages(mut self, include: bool) -> Self {
        self.include_hidden_pages = Some(include);
        self
    }

    /// Show hidden content elements.
    #[must_use]
    pub fn include_hidden_content(mut self, include: bool) -> Self {
        self.include_hidden_content = Some(include);
        self
    }

    /// Show soft-deleted records.
    #[must_use]
    pub fn include_deleted_records(mut self, include: bool) -> Self {
        self.include_deleted_records = Some(include);
        self
    }

    /// Act as the privileged sentinel user.
    #[must_use]
    pub fn as_privileged_user(mut self, enabled: bool) -> Self {
        self.act_as_privileged_user = Some(enabled);
        self
    }

    /// Install (or not) a render context.
    #[must_use]
    pub fn bootstrap_render_context(mut self, enabled: bool) -> Self {
        self.bootstrap_render_context = Some(enabled);
        self
    }

    /// Make nested simulations defer to this one.
    #[must_use]
    pub fn suppress_child_simulations(mut self, enabled: bool) -> Self {
        self.suppress_child_simulations = Some(enabled);
        self
    }

    /// Skip simulation when already nested.
    #[must_use]
    pub fn ignore_when_already_nested(mut self, enabled: bool) -> Self {
        self.ignore_when_already_nested = Some(enabled);
        self
    }

    /// Skip simulation when a render context already exists.
    #[must_use]
    pub fn ignore_when_render_context_exists(mut self, enabled: bool) -> Self {
        self.ignore_when_render_context_exists = Some(enabled);
        self
    }
}

/// The two options checked before any pass is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EarlyOptions {
    /// Skip simulation when already nested.
    pub ignore_when_already_nested: bool,
    /// Skip simulation when a render context already exists.
    pub ignore_when_render_context_exists: bool,
}

impl EarlyOptions {
    /// Extract the early options, defaulting unset ones to `false`.
    #[must_use]
    pub fn from_options(options: &SimulationOptions) -> Self {
        Self {
            ignore_when_already_nested: options.ignore_when_already_nested.unwrap_or(false),
            ignore_when_render_context_exists: options
                .ignore_when_render_context_exists
                .unwrap_or(false),
        }
    }
}
