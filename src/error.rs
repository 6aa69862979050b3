//! Error types for envsim.
//!
//! All errors are strongly typed using thiserror. The split mirrors the
//! phases of a simulation call: option validation, pass resolution,
//! identity provisioning, and access to the ambient slots themselves.

use thiserror::Error;

use crate::services::ServiceError;
use crate::simulation::PassKind;

/// Validation errors raised before any pass activates.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Option '{option}' is not declared by any registered pass")]
    UndeclaredOption {
        option: String,
    },

    #[error("Malformed option bag: {reason}")]
    MalformedOptions {
        reason: String,
    },

    #[error("Invalid value for option '{option}': {reason}")]
    InvalidOptionValue {
        option: String,
        reason: String,
    },

    #[error("Invalid simulator config: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Pass {kind} cannot be registered after {previous}")]
    PassOrder {
        kind: PassKind,
        previous: PassKind,
    },
}

/// Errors raised when a pass cannot resolve the value it should install.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Site not found: {identifier}")]
    SiteNotFound {
        identifier: String,
    },

    #[error("Page not found: {page_id}")]
    PageNotFound {
        page_id: u32,
    },

    #[error("Language '{requested}' is not resolvable{}", site_hint(.site))]
    LanguageNotResolvable {
        requested: String,
        site: Option<String>,
    },

    #[error("Language '{requested}' is ambiguous on site {site}: matches ids {candidates:?}")]
    AmbiguousLanguage {
        requested: String,
        site: String,
        candidates: Vec<u32>,
    },
}

fn site_hint(site: &Option<String>) -> String {
    match site {
        Some(site) => format!(" on site {site}"),
        None => " without a current site".to_string(),
    }
}

/// Errors raised while provisioning the privileged sentinel identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Sentinel user '{username}' could not be ensured after create-and-retry")]
    SentinelUnavailable {
        username: String,
    },

    #[error("User store error: {message}")]
    Store {
        message: String,
    },
}

/// Errors raised by ambient slot accessors.
#[derive(Debug, Error)]
pub enum AmbientError {
    #[error("Ambient slot '{slot}' lock poisoned")]
    Poisoned {
        slot: &'static str,
    },

    #[error("Ambient backend error: {message}")]
    Backend {
        message: String,
    },
}

/// Top-level error type for envsim.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Ambient state error: {0}")]
    Ambient(#[from] AmbientError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Rollback of {pass} pass failed: {source}")]
    Rollback {
        pass: PassKind,
        #[source]
        source: Box<SimError>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps an error raised while rolling back `pass`.
    #[must_use]
    pub fn rollback(pass: PassKind, source: SimError) -> Self {
        Self::Rollback {
            pass,
            source: Box::new(source),
        }
    }

    /// Returns true if this is a validation (configuration) error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a resolution error.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Returns true if this is an identity provisioning error.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Returns true if this error was raised during rollback.
    #[must_use]
    pub const fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }
}

/// Result type alias for envsim operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_option_message() {
        let err = ValidationError::UndeclaredOption {
            option: "includeHiddenPages".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("includeHiddenPages"));
        assert!(msg.contains("not declared"));
    }

    #[test]
    fn test_language_not_resolvable_mentions_site() {
        let err = ResolutionError::LanguageNotResolvable {
            requested: "fr".to_string(),
            site: Some("main".to_string()),
        };
        assert_eq!(format!("{err}"), "Language 'fr' is not resolvable on site main");

        let err = ResolutionError::LanguageNotResolvable {
            requested: "fr".to_string(),
            site: None,
        };
        assert!(format!("{err}").contains("without a current site"));
    }

    #[test]
    fn test_sim_error_from_resolution() {
        let err: SimError = ResolutionError::SiteNotFound {
            identifier: "missing".to_string(),
        }
        .into();
        assert!(err.is_resolution());
        assert!(!err.is_validation());
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn test_rollback_error_wraps_source() {
        let inner: SimError = AmbientError::Poisoned { slot: "site" }.into();
        let err = SimError::rollback(PassKind::Site, inner);
        assert!(err.is_rollback());
        let msg = format!("{err}");
        assert!(msg.contains("site"));
        assert!(msg.contains("poisoned"));
    }

    #[test]
    fn test_internal_error() {
        let err = SimError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
    }
}
