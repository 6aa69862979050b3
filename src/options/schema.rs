//! Typed option schema.
//!
//! Each pass folds the options it understands into the schema, together with
//! their defaults. Validation rejects anything the caller set that no pass
//! declared, checks value shapes, and fills the gaps from the defaults.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

use super::{FallbackLanguage, LanguageRef, OptionKey, SimulationOptions, SimulationRequest};

/// Conservative upper bound for site identifiers.
pub const MAX_SITE_IDENTIFIER_LEN: usize = 255;

fn site_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("site identifier pattern is valid")
    })
}

fn language_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]+([_\-][A-Za-z0-9]+)*$").expect("language code pattern is valid")
    })
}

fn invalid(key: OptionKey, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidOptionValue {
        option: key.as_str().to_string(),
        reason: reason.into(),
    }
}

fn validate_language_ref(key: OptionKey, language: &LanguageRef) -> Result<(), ValidationError> {
    match language {
        LanguageRef::Id(_) => Ok(()),
        LanguageRef::Iso(code) => {
            if code.trim().is_empty() {
                return Err(invalid(key, "language code cannot be empty"));
            }
            if !language_code_pattern().is_match(code) {
                return Err(invalid(key, format!("'{code}' is not a language code")));
            }
            Ok(())
        }
        LanguageRef::Language(language) => {
            if language.iso_code.trim().is_empty() {
                return Err(invalid(key, "language object has an empty ISO code"));
            }
            Ok(())
        }
    }
}

/// Declared options and their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSchema {
    declared: BTreeSet<OptionKey>,
    defaults: SimulationRequest,
}

impl OptionSchema {
    /// Empty schema: nothing declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option without a value default (optional options).
    #[must_use]
    pub fn declare(mut self, key: OptionKey) -> Self {
        self.declared.insert(key);
        self
    }

    /// Declare a boolean option with its default.
    ///
    /// Declaring a non-boolean key this way only marks it declared.
    #[must_use]
    pub fn declare_flag(mut self, key: OptionKey, default: bool) -> Self {
        let d = &mut self.defaults;
        match key {
            OptionKey::IncludeHiddenPages => d.include_hidden_pages = default,
            OptionKey::IncludeHiddenContent => d.include_hidden_content = default,
            OptionKey::IncludeDeletedRecords => d.include_deleted_records = default,
            OptionKey::ActAsPrivilegedUser => d.act_as_privileged_user = default,
            OptionKey::BootstrapRenderContext => d.bootstrap_render_context = default,
            OptionKey::SuppressChildSimulations => d.suppress_child_simulations = default,
            OptionKey::IgnoreWhenAlreadyNested => d.ignore_when_already_nested = default,
            OptionKey::IgnoreWhenRenderContextExists => {
                d.ignore_when_render_context_exists = default;
            }
            OptionKey::TargetPageId
            | OptionKey::TargetSiteId
            | OptionKey::Language
            | OptionKey::FallbackLanguage => {}
        }
        self.declared.insert(key);
        self
    }

    /// Returns true if `key` has been declared.
    #[must_use]
    pub fn is_declared(&self, key: OptionKey) -> bool {
        self.declared.contains(&key)
    }

    /// Validate raw options and build the request.
    pub fn validate(&self, options: &SimulationOptions) -> Result<SimulationRequest, ValidationError> {
        if let Some(key) = options
            .provided_keys()
            .into_iter()
            .find(|key| !self.is_declared(*key))
        {
            return Err(ValidationError::UndeclaredOption {
                option: key.as_str().to_string(),
            });
        }

        if options.target_page_id == Some(0) {
            return Err(invalid(OptionKey::TargetPageId, "page id must be > 0"));
        }

        if let Some(identifier) = &options.target_site_id {
            if identifier.len() > MAX_SITE_IDENTIFIER_LEN {
                return Err(invalid(
                    OptionKey::TargetSiteId,
                    format!("exceeds {MAX_SITE_IDENTIFIER_LEN} bytes"),
                ));
            }
            if !site_identifier_pattern().is_match(identifier) {
                return Err(invalid(
                    OptionKey::TargetSiteId,
                    format!("'{identifier}' is not a site identifier"),
                ));
            }
        }

        if let Some(language) = &options.language {
            validate_language_ref(OptionKey::Language, language)?;
        }
        if let Some(FallbackLanguage::Language(language)) = &options.fallback_language {
            validate_language_ref(OptionKey::FallbackLanguage, language)?;
        }

        let d = &self.defaults;
        Ok(SimulationRequest {
            target_page_id: options.target_page_id.or(d.target_page_id),
            target_site_id: options.target_site_id.clone().or_else(|| d.target_site_id.clone()),
            language: options.language.clone().or_else(|| d.language.clone()),
            fallback_language: options
                .fallback_language
                .clone()
                .or_else(|| d.fallback_language.clone()),
            include_hidden_pages: options.include_hidden_pages.unwrap_or(d.include_hidden_pages),
            include_hidden_content: options
                .include_hidden_content
                .unwrap_or(d.include_hidden_content),
            include_deleted_records: options
                .include_deleted_records
                .unwrap_or(d.include_deleted_records),
            act_as_privileged_user: options
                .act_as_privileged_user
                .unwrap_or(d.act_as_privileged_user),
            bootstrap_render_context: options
                .bootstrap_render_context
                .unwrap_or(d.bootstrap_render_context),
            suppress_child_simulations: options
                .suppress_child_simulations
                .unwrap_or(d.suppress_child_simulations),
            ignore_when_already_nested: options
                .ignore_when_already_nested
                .unwrap_or(d.ignore_when_already_nested),
            ignore_when_render_context_exists: options
                .ignore_when_render_context_exists
                .unwrap_or(d.ignore_when_render_context_exists),
        })
    }
}
