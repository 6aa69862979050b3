//! Language pass: swaps the language aspect and the language service.
//!
//! Resolution against the current site:
//! - a language object is used as is;
//! - a numeric id matches a configured language id;
//! - a two-letter code matches a configured ISO code, case-insensitively;
//! - otherwise the fallback is tried (`default` = the site default language);
//! - if nothing matches, the call fails.
//!
//! When no language is requested at all the pass still runs if no language
//! service exists yet, and installs one for the language already in effect.

use std::sync::Arc;

use tracing::debug;

use crate::ambient::{AmbientContext, LanguageAspect, LanguageService, Site, SiteLanguage};
use crate::error::{ResolutionError, SimResult};
use crate::options::{FallbackLanguage, LanguageRef, OptionKey, OptionSchema, SimulationRequest};
use crate::simulation::pass::{token_mismatch, PassKind, RollbackToken, SimulationPass};

fn is_iso_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

fn not_resolvable(requested: String, site: Option<&Site>) -> ResolutionError {
    ResolutionError::LanguageNotResolvable {
        requested,
        site: site.map(|s| s.identifier.clone()),
    }
}

fn match_in_site(site: &Site, requested: &LanguageRef) -> Result<Option<SiteLanguage>, ResolutionError> {
    match requested {
        LanguageRef::Language(language) => Ok(Some(language.clone())),
        LanguageRef::Id(id) => Ok(site.language(*id).cloned()),
        LanguageRef::Iso(code) => {
            if !is_iso_code(code) {
                return Ok(None);
            }
            let mut matches = site
                .languages
                .iter()
                .filter(|l| l.iso_code.eq_ignore_ascii_case(code));
            let Some(first) = matches.next() else {
                return Ok(None);
            };
            let mut candidates: Vec<u32> = std::iter::once(first.language_id)
                .chain(matches.map(|l| l.language_id))
                .collect();
            candidates.sort_unstable();
            candidates.dedup();
            if candidates.len() > 1 {
                return Err(ResolutionError::AmbiguousLanguage {
                    requested: code.clone(),
                    site: site.identifier.clone(),
                    candidates,
                });
            }
            Ok(Some(first.clone()))
        }
    }
}

fn resolve_fallback(
    site: Option<&Site>,
    fallback: &FallbackLanguage,
) -> Result<SiteLanguage, ResolutionError> {
    match fallback {
        FallbackLanguage::SiteDefault => site
            .and_then(Site::default_language)
            .cloned()
            .ok_or_else(|| not_resolvable(fallback.to_string(), site)),
        FallbackLanguage::Language(language) => resolve_language(site, language, None),
    }
}

/// Resolve `requested` (then `fallback`) against `site`.
///
/// The fallback is tried once; a fallback that does not resolve is not
/// followed any further.
pub fn resolve_language(
    site: Option<&Site>,
    requested: &LanguageRef,
    fallback: Option<&FallbackLanguage>,
) -> Result<SiteLanguage, ResolutionError> {
    if let LanguageRef::Language(language) = requested {
        return Ok(language.clone());
    }
    if let Some(site) = site {
        if let Some(language) = match_in_site(site, requested)? {
            return Ok(language);
        }
    }
    match fallback {
        Some(fallback) => resolve_fallback(site, fallback)
            .map_err(|_| not_resolvable(format!("{requested} (fallback {fallback})"), site)),
        None => Err(not_resolvable(requested.to_string(), site)),
    }
}

/// Content fallback chain for `language`, following the site's configured
/// fallbacks at most `max_depth` hops deep.
///
/// Hop one is the language's own fallback list; each further hop appends the
/// fallbacks of the languages reached in the previous one. Ids appear once,
/// in discovery order, and never include `language` itself.
pub fn content_fallback_chain(
    site: Option<&Site>,
    language: &SiteLanguage,
    max_depth: usize,
) -> Vec<u32> {
    let mut chain: Vec<u32> = Vec::new();
    let mut frontier: Vec<u32> = language.fallbacks.clone();
    for _ in 0..max_depth {
        let mut next = Vec::new();
        for id in frontier {
            if id == language.language_id || chain.contains(&id) {
                continue;
            }
            chain.push(id);
            if let Some(configured) = site.and_then(|s| s.language(id)) {
                next.extend(configured.fallbacks.iter().copied());
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    chain
}

/// Installs the requested language, or bootstraps a language service.
pub struct LanguagePass {
    ambient: Arc<dyn AmbientContext>,
    default_key: String,
    max_fallback_depth: usize,
}

impl LanguagePass {
    /// Create the pass.
    #[must_use]
    pub fn new(ambient: Arc<dyn AmbientContext>, default_key: String, max_fallback_depth: usize) -> Self {
        Self {
            ambient,
            default_key,
            max_fallback_depth,
        }
    }

    fn requested_language(
        &self,
        site: Option<&Site>,
        request: &SimulationRequest,
    ) -> Result<SiteLanguage, ResolutionError> {
        match (&request.language, &request.fallback_language) {
            (Some(language), fallback) => resolve_language(site, language, fallback.as_ref()),
            (None, Some(fallback)) => resolve_fallback(site, fallback),
            (None, None) => Err(not_resolvable(String::new(), site)),
        }
    }

    fn aspect_for(&self, site: Option<&Site>, language: &SiteLanguage) -> LanguageAspect {
        LanguageAspect {
            fallback_chain: content_fallback_chain(site, language, self.max_fallback_depth),
            ..LanguageAspect::for_language(language)
        }
    }

    /// Service (and aspect) for the language already in effect.
    fn bootstrap(
        &self,
        site: Option<&Site>,
        aspect: Option<&LanguageAspect>,
    ) -> (Option<LanguageAspect>, LanguageService) {
        let language = site.and_then(|site| {
            aspect
                .and_then(|a| site.language(a.language_id))
                .or_else(|| site.default_language())
        });
        match language {
            Some(language) => (
                aspect
                    .cloned()
                    .or_else(|| Some(self.aspect_for(site, language))),
                LanguageService::for_language(language),
            ),
            None => (aspect.cloned(), LanguageService::new(self.default_key.clone())),
        }
    }
}

impl SimulationPass for LanguagePass {
    fn kind(&self) -> PassKind {
        PassKind::Language
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema
            .declare(OptionKey::Language)
            .declare(OptionKey::FallbackLanguage)
    }

    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool> {
        if request.language.is_some() || request.fallback_language.is_some() {
            return Ok(true);
        }
        Ok(self.ambient.language_service()?.is_none())
    }

    fn setup(&self, request: &SimulationRequest) -> SimResult<RollbackToken> {
        let site = self.ambient.current_site()?;
        let previous_aspect = self.ambient.language_aspect()?;
        let previous_service = self.ambient.language_service()?;

        let (aspect, service) = if request.language.is_none() && request.fallback_language.is_none() {
            self.bootstrap(site.as_deref(), previous_aspect.as_ref())
        } else {
            let language = self.requested_language(site.as_deref(), request)?;
            (
                Some(self.aspect_for(site.as_deref(), &language)),
                LanguageService::for_language(&language),
            )
        };

        debug!(
            language_id = aspect.as_ref().map(|a| a.language_id),
            key = service.key(),
            "switching language"
        );
        self.ambient.set_language_aspect(aspect)?;
        self.ambient.set_language_service(Some(Arc::new(service)))?;
        Ok(RollbackToken::Language {
            aspect: previous_aspect,
            service: previous_service,
        })
    }

    fn rollback(&self, token: RollbackToken) -> SimResult<()> {
        let RollbackToken::Language { aspect, service } = token else {
            return Err(token_mismatch(PassKind::Language, &token));
        };
        self.ambient.set_language_aspect(aspect)?;
        self.ambient.set_language_service(service)?;
        Ok(())
    }
}
