//! The resolved, immutable per-call request.

use super::{FallbackLanguage, LanguageRef};

/// Validated, defaulted override parameters for one simulation call.
///
/// Only built by [`OptionSchema::validate`](super::OptionSchema::validate);
/// passes receive it by shared reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    /// Page to simulate.
    pub target_page_id: Option<u32>,
    /// Site to simulate.
    pub target_site_id: Option<String>,
    /// Language to simulate.
    pub language: Option<LanguageRef>,
    /// Language to use when `language` does not resolve.
    pub fallback_language: Option<FallbackLanguage>,
    /// Show hidden pages.
    pub include_hidden_pages: bool,
    /// Show hidden content elements.
    pub include_hidden_content: bool,
    /// Show soft-deleted records.
    pub include_deleted_records: bool,
    /// Act as the privileged sentinel user.
    pub act_as_privileged_user: bool,
    /// Install a render context for the target page.
    pub bootstrap_render_context: bool,
    /// Make nested simulations defer to this one.
    pub suppress_child_simulations: bool,
    /// Skip simulation entirely when already inside one.
    pub ignore_when_already_nested: bool,
    /// Skip simulation entirely when a render context exists.
    pub ignore_when_render_context_exists: bool,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            target_page_id: None,
            target_site_id: None,
            language: None,
            fallback_language: None,
            include_hidden_pages: false,
            include_hidden_content: false,
            include_deleted_records: false,
            act_as_privileged_user: false,
            bootstrap_render_context: true,
            suppress_child_simulations: false,
            ignore_when_already_nested: false,
            ignore_when_render_context_exists: false,
        }
    }
}
