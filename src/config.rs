//! Simulator configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound for configured identifiers (usernames, language keys).
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Configuration for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Username of the privileged sentinel identity.
    pub admin_username: String,
    /// Language-service key used when no site provides a language.
    pub default_language_key: String,
    /// How many hops the content fallback chain follows through the site's
    /// configured language fallbacks.
    pub max_language_fallback_depth: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            admin_username: "_simulation_admin_".to_string(),
            default_language_key: "default".to_string(),
            max_language_fallback_depth: 1,
        }
    }
}

impl SimulatorConfig {
    /// Validate the configuration.
    ///
    /// Called by the simulator constructors before any pass is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identifier("adminUsername", &self.admin_username)?;
        validate_identifier("defaultLanguageKey", &self.default_language_key)?;
        if self.max_language_fallback_depth == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "maxLanguageFallbackDepth must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_identifier(field: &str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidConfig {
            reason: format!("{field} cannot be empty"),
        });
    }
    if trimmed.len() != value.len() {
        return Err(ValidationError::InvalidConfig {
            reason: format!("{field} cannot have surrounding whitespace"),
        });
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::InvalidConfig {
            reason: format!("{field} exceeds {MAX_IDENTIFIER_LEN} bytes"),
        });
    }
    Ok(())
}
