//! Render context: the bundle of objects needed to render "as if on page X".

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aspects::{LanguageAspect, SiteLanguage};

/// A page record as returned by the page lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Page id.
    pub uid: u32,
    /// Parent page id (0 for pages directly below the tree root).
    pub pid: u32,
    /// Page title.
    pub title: String,
}

impl PageRecord {
    /// Create a page record.
    #[must_use]
    pub fn new(uid: u32, pid: u32, title: impl Into<String>) -> Self {
        Self {
            uid,
            pid,
            title: title.into(),
        }
    }

    /// The virtual root of the page tree (page 0). It has no stored record.
    #[must_use]
    pub fn tree_root() -> Self {
        Self::new(0, 0, "")
    }
}

/// Locale settings derived from the render language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleSettings {
    /// Language id.
    pub language_id: u32,
    /// Two-letter ISO code, empty when no site language is known.
    pub iso_code: String,
    /// System locale, `C` when no site language is known.
    pub locale: String,
}

impl LocaleSettings {
    /// Settings for a resolved site language.
    #[must_use]
    pub fn for_language(language: &SiteLanguage) -> Self {
        Self {
            language_id: language.language_id,
            iso_code: language.iso_code.to_ascii_lowercase(),
            locale: language.locale.clone(),
        }
    }

    /// Settings used when no site language matches the aspect.
    #[must_use]
    pub fn neutral(language_id: u32) -> Self {
        Self {
            language_id,
            iso_code: String::new(),
            locale: "C".to_string(),
        }
    }
}

/// Content-rendering helper bound to a page and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRenderer {
    page_id: u32,
    language_id: u32,
}

impl ContentRenderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new(page_id: u32, language_id: u32) -> Self {
        Self { page_id, language_id }
    }

    /// Page the renderer renders.
    #[must_use]
    pub const fn page_id(&self) -> u32 {
        self.page_id
    }

    /// Build a link to `page_id` in the renderer's language.
    #[must_use]
    pub fn link_to_page(&self, page_id: u32) -> String {
        if self.language_id == 0 {
            format!("/?id={page_id}")
        } else {
            format!("/?id={page_id}&L={}", self.language_id)
        }
    }
}

/// Synthetic front-end visitor used while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendUser {
    /// Whether the visitor is logged in.
    pub logged_in: bool,
    /// Group ids; `0` is "everybody", `-1` is "hide at login".
    pub groups: Vec<i32>,
}

impl FrontendUser {
    /// Anonymous visitor.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            logged_in: false,
            groups: vec![0, -1],
        }
    }
}

/// Stable identifier for a built render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderContextId(Uuid);

impl RenderContextId {
    /// Create a new random render-context ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to render a page in a language.
///
/// Instances are expensive to build and shared through `Arc`; identity is
/// compared with `Arc::ptr_eq`.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Identity for logging.
    pub id: RenderContextId,
    /// Rendered page.
    pub page_id: u32,
    /// Root line from the rendered page up to the tree root.
    pub root_line: Vec<PageRecord>,
    /// Record of the rendered page.
    pub page: PageRecord,
    /// Locale settings.
    pub locale: LocaleSettings,
    /// Content-rendering helper.
    pub renderer: ContentRenderer,
    /// Synthetic visitor.
    pub frontend_user: FrontendUser,
    /// Language aspect the context was built under.
    pub language: LanguageAspect,
    /// When the context was built.
    pub built_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_links_carry_language_parameter() {
        assert_eq!(ContentRenderer::new(5, 0).link_to_page(7), "/?id=7");
        assert_eq!(ContentRenderer::new(5, 2).link_to_page(7), "/?id=7&L=2");
    }

    #[test]
    fn anonymous_visitor_is_not_logged_in() {
        let user = FrontendUser::anonymous();
        assert!(!user.logged_in);
        assert_eq!(user.groups, vec![0, -1]);
    }

    #[test]
    fn locale_settings_from_language() {
        let lang = SiteLanguage::new(1, "DE", "German", "de_DE.UTF-8");
        let settings = LocaleSettings::for_language(&lang);
        assert_eq!(settings.iso_code, "de");
        assert_eq!(settings.locale, "de_DE.UTF-8");
        assert_eq!(LocaleSettings::neutral(4).locale, "C");
    }
}
