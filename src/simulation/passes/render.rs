//! Render-context pass: installs a (memoized) render context.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::ambient::{
    AmbientContext, ContentRenderer, FrontendUser, LanguageAspect, LocaleSettings, PageRecord,
    RenderContext, RenderContextId, Site,
};
use crate::error::{ResolutionError, SimResult};
use crate::options::{OptionKey, OptionSchema, SimulationRequest};
use crate::services::PageLookup;
use crate::simulation::pass::{token_mismatch, PassKind, RollbackToken, SimulationPass};
use crate::simulation::render_cache::{RenderCacheKey, RenderContextCache};

/// Builds or reuses a render context for the target page.
///
/// After installing the context the pass writes the language aspect that was
/// active before, so a context built under another language never leaks its
/// language into the ambient state. Hosts whose ambient store derives the
/// language from the render context rely on this.
pub struct RenderContextPass {
    ambient: Arc<dyn AmbientContext>,
    pages: Arc<dyn PageLookup>,
    cache: RenderContextCache,
}

impl RenderContextPass {
    /// Create the pass with an empty cache.
    #[must_use]
    pub fn new(ambient: Arc<dyn AmbientContext>, pages: Arc<dyn PageLookup>) -> Self {
        Self {
            ambient,
            pages,
            cache: RenderContextCache::new(),
        }
    }

    /// The memoization cache.
    #[must_use]
    pub fn cache(&self) -> &RenderContextCache {
        &self.cache
    }

    fn target_page(request: &SimulationRequest, site: Option<&Site>) -> u32 {
        request
            .target_page_id
            .or_else(|| site.map(|s| s.root_page_id))
            .unwrap_or(0)
    }

    fn locale(site: Option<&Site>, language: Option<&LanguageAspect>) -> LocaleSettings {
        let Some(site) = site else {
            return LocaleSettings::neutral(language.map_or(0, |a| a.language_id));
        };
        let configured = match language {
            Some(aspect) => site.language(aspect.language_id),
            None => site.default_language(),
        };
        match configured {
            Some(configured) => LocaleSettings::for_language(configured),
            None => LocaleSettings::neutral(language.map_or(0, |a| a.language_id)),
        }
    }

    fn build(
        &self,
        page_id: u32,
        site: Option<&Site>,
        language: Option<&LanguageAspect>,
    ) -> SimResult<RenderContext> {
        let (page, root_line) = if page_id == 0 {
            (PageRecord::tree_root(), Vec::new())
        } else {
            let page = self
                .pages
                .page_info(page_id)?
                .ok_or(ResolutionError::PageNotFound { page_id })?;
            (page, self.pages.root_line(page_id)?)
        };

        let locale = Self::locale(site, language);
        let language = language.cloned().unwrap_or_else(|| LanguageAspect {
            language_id: locale.language_id,
            content_id: locale.language_id,
            fallback_chain: Vec::new(),
        });

        let context = RenderContext {
            id: RenderContextId::new(),
            page_id,
            root_line,
            page,
            renderer: ContentRenderer::new(page_id, language.language_id),
            locale,
            frontend_user: FrontendUser::anonymous(),
            language,
            built_at: Utc::now(),
        };
        debug!(context = %context.id, page_id, "built render context");
        Ok(context)
    }
}

impl SimulationPass for RenderContextPass {
    fn kind(&self) -> PassKind {
        PassKind::RenderContext
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema
            .declare(OptionKey::TargetPageId)
            .declare_flag(OptionKey::BootstrapRenderContext, true)
    }

    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool> {
        if request.bootstrap_render_context {
            return Ok(true);
        }
        Ok(self.ambient.render_context()?.is_none())
    }

    fn setup(&self, request: &SimulationRequest) -> SimResult<RollbackToken> {
        let site = self.ambient.current_site()?;
        let language = self.ambient.language_aspect()?;
        let page_id = Self::target_page(request, site.as_deref());

        let key = RenderCacheKey::new(page_id, language.as_ref())?;
        let (context, hit) = self.cache.get_or_try_insert_with(key, || {
            self.build(page_id, site.as_deref(), language.as_ref())
        })?;
        debug!(%key, hit, page_id, "installing render context");

        let previous = self.ambient.render_context()?;
        self.ambient.set_render_context(Some(context))?;
        self.ambient.set_language_aspect(language.clone())?;
        Ok(RollbackToken::RenderContext { previous, language })
    }

    fn rollback(&self, token: RollbackToken) -> SimResult<()> {
        let RollbackToken::RenderContext { previous, language } = token else {
            return Err(token_mismatch(PassKind::RenderContext, &token));
        };
        self.ambient.set_render_context(previous)?;
        self.ambient.set_language_aspect(language)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::{InMemoryAmbient, SiteLanguage};
    use crate::services::InMemoryPageLookup;

    fn fixture() -> (Arc<InMemoryAmbient>, RenderContextPass) {
        let ambient = Arc::new(InMemoryAmbient::new());
        let pages = Arc::new(InMemoryPageLookup::default());
        pages.insert(PageRecord::new(1, 0, "Home")).unwrap();
        pages.insert(PageRecord::new(2, 1, "News")).unwrap();
        let pass = RenderContextPass::new(ambient.clone(), pages);
        (ambient, pass)
    }

    fn page(page_id: u32) -> SimulationRequest {
        SimulationRequest {
            target_page_id: Some(page_id),
            ..SimulationRequest::default()
        }
    }

    #[test]
    fn builds_root_line_and_locale() {
        let (ambient, pass) = fixture();
        ambient
            .set_current_site(Some(Arc::new(Site::new(
                "main",
                1,
                vec![SiteLanguage::new(0, "en", "English", "en_US.UTF-8")],
            ))))
            .unwrap();

        let token = pass.setup(&page(2)).unwrap();
        let context = ambient.render_context().unwrap().unwrap();
        assert_eq!(context.page.title, "News");
        let uids: Vec<u32> = context.root_line.iter().map(|p| p.uid).collect();
        assert_eq!(uids, vec![2, 1]);
        assert_eq!(context.locale.locale, "en_US.UTF-8");
        assert_eq!(context.renderer.page_id(), 2);
        assert!(!context.frontend_user.logged_in);

        pass.rollback(token).unwrap();
        assert!(ambient.render_context().unwrap().is_none());
    }

    #[test]
    fn same_page_and_language_reuse_the_instance() {
        let (ambient, pass) = fixture();
        let token = pass.setup(&page(1)).unwrap();
        let first = ambient.render_context().unwrap().unwrap();
        pass.rollback(token).unwrap();

        let token = pass.setup(&page(1)).unwrap();
        let second = ambient.render_context().unwrap().unwrap();
        pass.rollback(token).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let token = pass.setup(&page(2)).unwrap();
        let third = ambient.render_context().unwrap().unwrap();
        pass.rollback(token).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(pass.cache().len().unwrap(), 2);
    }

    #[test]
    fn missing_page_fails_without_installing() {
        let (ambient, pass) = fixture();
        let err = pass.setup(&page(404)).unwrap_err();
        assert!(err.is_resolution());
        assert!(ambient.render_context().unwrap().is_none());
        assert!(pass.cache().is_empty().unwrap());
    }

    #[test]
    fn falls_back_to_site_root_then_tree_root() {
        let (ambient, pass) = fixture();
        pass.setup(&SimulationRequest::default()).unwrap();
        assert_eq!(ambient.render_context().unwrap().unwrap().page_id, 0);

        ambient
            .set_current_site(Some(Arc::new(Site::new("main", 1, Vec::new()))))
            .unwrap();
        pass.setup(&SimulationRequest::default()).unwrap();
        assert_eq!(ambient.render_context().unwrap().unwrap().page_id, 1);
    }

    #[test]
    fn activates_when_forbidden_only_if_no_context_exists() {
        let (_ambient, pass) = fixture();
        let forbidden = SimulationRequest {
            bootstrap_render_context: false,
            ..SimulationRequest::default()
        };
        assert!(pass.needs_activation(&forbidden).unwrap());
        pass.setup(&page(1)).unwrap();
        assert!(!pass.needs_activation(&forbidden).unwrap());
        assert!(pass.needs_activation(&page(1)).unwrap());
    }
}
