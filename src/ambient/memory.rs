//! In-memory ambient context.
//!
//! Thread-safe reference implementation of [`AmbientContext`], used by
//! embedders that keep their request context in-process and by tests.

use std::sync::{Arc, RwLock};

use crate::error::AmbientError;

use super::{
    AmbientContext, AmbientResult, LanguageAspect, LanguageService, RenderContext, Site,
    UserIdentity, VisibilityAspect,
};

fn read_slot<T: Clone>(slot: &RwLock<T>, name: &'static str) -> AmbientResult<T> {
    slot.read()
        .map(|guard| guard.clone())
        .map_err(|_| AmbientError::Poisoned { slot: name })
}

fn write_slot<T>(slot: &RwLock<T>, name: &'static str, value: T) -> AmbientResult<()> {
    let mut guard = slot.write().map_err(|_| AmbientError::Poisoned { slot: name })?;
    *guard = value;
    Ok(())
}

/// RwLock-per-slot ambient context.
#[derive(Debug, Default)]
pub struct InMemoryAmbient {
    site: RwLock<Option<Arc<Site>>>,
    language_aspect: RwLock<Option<LanguageAspect>>,
    language_service: RwLock<Option<Arc<LanguageService>>>,
    visibility: RwLock<VisibilityAspect>,
    user: RwLock<Option<UserIdentity>>,
    render_context: RwLock<Option<Arc<RenderContext>>>,
}

impl InMemoryAmbient {
    /// Create an empty ambient context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every slot at once.
    pub fn snapshot(&self) -> AmbientResult<AmbientSnapshot> {
        Ok(AmbientSnapshot {
            site: self.current_site()?,
            language_aspect: self.language_aspect()?,
            language_service: self.language_service()?,
            visibility: self.visibility()?,
            user: self.user()?,
            render_context: self.render_context()?,
        })
    }
}

impl AmbientContext for InMemoryAmbient {
    fn current_site(&self) -> AmbientResult<Option<Arc<Site>>> {
        read_slot(&self.site, "site")
    }

    fn set_current_site(&self, site: Option<Arc<Site>>) -> AmbientResult<()> {
        write_slot(&self.site, "site", site)
    }

    fn language_aspect(&self) -> AmbientResult<Option<LanguageAspect>> {
        read_slot(&self.language_aspect, "language_aspect")
    }

    fn set_language_aspect(&self, aspect: Option<LanguageAspect>) -> AmbientResult<()> {
        write_slot(&self.language_aspect, "language_aspect", aspect)
    }

    fn language_service(&self) -> AmbientResult<Option<Arc<LanguageService>>> {
        read_slot(&self.language_service, "language_service")
    }

    fn set_language_service(&self, service: Option<Arc<LanguageService>>) -> AmbientResult<()> {
        write_slot(&self.language_service, "language_service", service)
    }

    fn visibility(&self) -> AmbientResult<VisibilityAspect> {
        read_slot(&self.visibility, "visibility")
    }

    fn set_visibility(&self, visibility: VisibilityAspect) -> AmbientResult<()> {
        write_slot(&self.visibility, "visibility", visibility)
    }

    fn user(&self) -> AmbientResult<Option<UserIdentity>> {
        read_slot(&self.user, "user")
    }

    fn set_user(&self, user: Option<UserIdentity>) -> AmbientResult<()> {
        write_slot(&self.user, "user", user)
    }

    fn render_context(&self) -> AmbientResult<Option<Arc<RenderContext>>> {
        read_slot(&self.render_context, "render_context")
    }

    fn set_render_context(&self, context: Option<Arc<RenderContext>>) -> AmbientResult<()> {
        write_slot(&self.render_context, "render_context", context)
    }
}

/// Point-in-time copy of every ambient slot.
///
/// Equality compares shared objects (site, language service, render context)
/// by identity, so a snapshot only equals another if the very same instances
/// are installed.
#[derive(Debug, Clone)]
pub struct AmbientSnapshot {
    /// Current site.
    pub site: Option<Arc<Site>>,
    /// Language aspect.
    pub language_aspect: Option<LanguageAspect>,
    /// Language service.
    pub language_service: Option<Arc<LanguageService>>,
    /// Visibility aspect.
    pub visibility: VisibilityAspect,
    /// Acting user.
    pub user: Option<UserIdentity>,
    /// Render context.
    pub render_context: Option<Arc<RenderContext>>,
}

fn same_instance<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl PartialEq for AmbientSnapshot {
    fn eq(&self, other: &Self) -> bool {
        same_instance(&self.site, &other.site)
            && self.language_aspect == other.language_aspect
            && same_instance(&self.language_service, &other.language_service)
            && self.visibility == other.visibility
            && self.user == other.user
            && same_instance(&self.render_context, &other.render_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::SiteLanguage;

    #[test]
    fn slots_start_empty() {
        let ambient = InMemoryAmbient::new();
        assert!(ambient.current_site().unwrap().is_none());
        assert!(ambient.language_aspect().unwrap().is_none());
        assert!(ambient.language_service().unwrap().is_none());
        assert_eq!(ambient.visibility().unwrap(), VisibilityAspect::default());
        assert!(ambient.user().unwrap().is_none());
        assert!(ambient.render_context().unwrap().is_none());
    }

    #[test]
    fn snapshot_compares_sites_by_identity() {
        let ambient = InMemoryAmbient::new();
        let site = Arc::new(Site::new("main", 1, vec![SiteLanguage::new(0, "en", "English", "en_US.UTF-8")]));
        ambient.set_current_site(Some(Arc::clone(&site))).unwrap();
        let before = ambient.snapshot().unwrap();

        // Equal by value, different instance.
        ambient.set_current_site(Some(Arc::new((*site).clone()))).unwrap();
        assert_ne!(before, ambient.snapshot().unwrap());

        ambient.set_current_site(Some(site)).unwrap();
        assert_eq!(before, ambient.snapshot().unwrap());
    }

    #[test]
    fn writes_replace_whole_slot() {
        let ambient = InMemoryAmbient::new();
        let visibility = VisibilityAspect {
            include_hidden_pages: true,
            include_hidden_content: false,
            include_deleted_records: true,
        };
        ambient.set_visibility(visibility).unwrap();
        assert_eq!(ambient.visibility().unwrap(), visibility);
    }
}
