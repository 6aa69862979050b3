//! The pass contract.

use std::fmt;
use std::sync::Arc;

use crate::ambient::{LanguageAspect, LanguageService, RenderContext, Site, UserIdentity, VisibilityAspect};
use crate::error::SimResult;
use crate::options::{OptionSchema, SimulationRequest};

/// The five kinds of pass, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    /// Swaps the current site.
    Site,
    /// Swaps the acting user for the privileged sentinel.
    AdminIdentity,
    /// Swaps the visibility aspect.
    Visibility,
    /// Swaps the language aspect and language service.
    Language,
    /// Installs a render context.
    RenderContext,
}

impl PassKind {
    /// All kinds in the order they must run.
    pub const ORDER: [Self; 5] = [
        Self::Site,
        Self::AdminIdentity,
        Self::Visibility,
        Self::Language,
        Self::RenderContext,
    ];

    /// Stable name for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::AdminIdentity => "admin-identity",
            Self::Visibility => "visibility",
            Self::Language => "language",
            Self::RenderContext => "render-context",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undo data captured by a pass's setup, consumed once by its rollback.
#[derive(Debug, Clone)]
pub enum RollbackToken {
    /// Previous current site.
    Site {
        /// Site to restore.
        previous: Option<Arc<Site>>,
    },
    /// Previous acting user.
    AdminIdentity {
        /// User to restore.
        previous: Option<UserIdentity>,
    },
    /// Previous visibility aspect.
    Visibility {
        /// Aspect to restore.
        previous: VisibilityAspect,
    },
    /// Previous language aspect and service, restored in that order.
    Language {
        /// Aspect to restore.
        aspect: Option<LanguageAspect>,
        /// Service to restore.
        service: Option<Arc<LanguageService>>,
    },
    /// Previous render context and the aspect active when it was replaced.
    RenderContext {
        /// Render context to restore.
        previous: Option<Arc<RenderContext>>,
        /// Language aspect re-applied after restoring.
        language: Option<LanguageAspect>,
    },
}

impl RollbackToken {
    /// Kind of pass that produced the token.
    #[must_use]
    pub const fn kind(&self) -> PassKind {
        match self {
            Self::Site { .. } => PassKind::Site,
            Self::AdminIdentity { .. } => PassKind::AdminIdentity,
            Self::Visibility { .. } => PassKind::Visibility,
            Self::Language { .. } => PassKind::Language,
            Self::RenderContext { .. } => PassKind::RenderContext,
        }
    }
}

/// One ambient-state override: activation test, setup, rollback.
///
/// Implementations restore unconditionally in `rollback`; they never diff
/// against the current state, since nested passes may have changed it.
pub trait SimulationPass: Send + Sync {
    /// Which slot(s) this pass overrides; fixes its registry position.
    fn kind(&self) -> PassKind;

    /// Add the options this pass understands. Must be idempotent.
    fn declare_options(&self, schema: OptionSchema) -> OptionSchema;

    /// Whether the pass must run for `request`. Reads, never writes.
    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool>;

    /// Capture the current state, then install the override.
    ///
    /// On error nothing may have been written.
    fn setup(&self, request: &SimulationRequest) -> SimResult<RollbackToken>;

    /// Restore the state captured in `token`.
    fn rollback(&self, token: RollbackToken) -> SimResult<()>;
}

/// Error for a token handed to the wrong pass.
pub(crate) fn token_mismatch(expected: PassKind, token: &RollbackToken) -> crate::error::SimError {
    crate::error::SimError::internal(format!(
        "{expected} pass received a {} rollback token",
        token.kind()
    ))
}
