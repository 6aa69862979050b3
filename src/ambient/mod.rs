//! Ambient execution state.
//!
//! The ambient context is the set of process-wide slots ordinary code reads
//! implicitly: current site, language, visibility rules, acting user and
//! render context. Only the simulator's passes write to it.

pub mod aspects;
pub mod memory;
pub mod render;

pub use aspects::{
    LanguageAspect, LanguageService, Site, SiteLanguage, UserId, UserIdentity, VisibilityAspect,
};
pub use memory::InMemoryAmbient;
pub use render::{
    ContentRenderer, FrontendUser, LocaleSettings, PageRecord, RenderContext, RenderContextId,
};

use std::sync::Arc;

use crate::error::AmbientError;

/// Result alias for ambient slot access.
pub type AmbientResult<T> = Result<T, AmbientError>;

/// Accessors for the ambient slots.
///
/// Each slot is read and written as a whole; there are no partial updates.
/// Implementations must be safe to share across threads even though the
/// simulator drives them from a single thread of control.
pub trait AmbientContext: Send + Sync {
    /// Current site, if one is active.
    fn current_site(&self) -> AmbientResult<Option<Arc<Site>>>;

    /// Replace the current site.
    fn set_current_site(&self, site: Option<Arc<Site>>) -> AmbientResult<()>;

    /// Current language aspect.
    fn language_aspect(&self) -> AmbientResult<Option<LanguageAspect>>;

    /// Replace the language aspect.
    fn set_language_aspect(&self, aspect: Option<LanguageAspect>) -> AmbientResult<()>;

    /// Current language service.
    fn language_service(&self) -> AmbientResult<Option<Arc<LanguageService>>>;

    /// Replace the language service.
    fn set_language_service(&self, service: Option<Arc<LanguageService>>) -> AmbientResult<()>;

    /// Current visibility aspect.
    fn visibility(&self) -> AmbientResult<VisibilityAspect>;

    /// Replace the visibility aspect.
    fn set_visibility(&self, visibility: VisibilityAspect) -> AmbientResult<()>;

    /// Acting user identity.
    fn user(&self) -> AmbientResult<Option<UserIdentity>>;

    /// Replace the acting user identity.
    fn set_user(&self, user: Option<UserIdentity>) -> AmbientResult<()>;

    /// Current render context.
    fn render_context(&self) -> AmbientResult<Option<Arc<RenderContext>>>;

    /// Replace the render context.
    fn set_render_context(&self, context: Option<Arc<RenderContext>>) -> AmbientResult<()>;
}
