//! Site pass: swaps the current site.

use std::sync::Arc;

use tracing::debug;

use crate::ambient::AmbientContext;
use crate::error::{ResolutionError, SimResult};
use crate::options::{OptionKey, OptionSchema, SimulationRequest};
use crate::services::SiteLookup;
use crate::simulation::pass::{token_mismatch, PassKind, RollbackToken, SimulationPass};

/// Installs the site named by `targetSiteId`.
pub struct SitePass {
    ambient: Arc<dyn AmbientContext>,
    sites: Arc<dyn SiteLookup>,
}

impl SitePass {
    /// Create the pass.
    #[must_use]
    pub fn new(ambient: Arc<dyn AmbientContext>, sites: Arc<dyn SiteLookup>) -> Self {
        Self { ambient, sites }
    }
}

impl SimulationPass for SitePass {
    fn kind(&self) -> PassKind {
        PassKind::Site
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema.declare(OptionKey::TargetSiteId)
    }

    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool> {
        let Some(identifier) = &request.target_site_id else {
            return Ok(false);
        };
        let current = self.ambient.current_site()?;
        Ok(current.map_or(true, |site| site.identifier != *identifier))
    }

    fn setup(&self, request: &SimulationRequest) -> SimResult<RollbackToken> {
        let identifier = request.target_site_id.as_deref().unwrap_or_default();
        let site = self
            .sites
            .site_by_identifier(identifier)?
            .ok_or_else(|| ResolutionError::SiteNotFound {
                identifier: identifier.to_string(),
            })?;

        let previous = self.ambient.current_site()?;
        debug!(
            site = %site.identifier,
            previous = previous.as_ref().map(|s| s.identifier.as_str()),
            "switching site"
        );
        self.ambient.set_current_site(Some(site))?;
        Ok(RollbackToken::Site { previous })
    }

    fn rollback(&self, token: RollbackToken) -> SimResult<()> {
        let RollbackToken::Site { previous } = token else {
            return Err(token_mismatch(PassKind::Site, &token));
        };
        self.ambient.set_current_site(previous)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::{InMemoryAmbient, Site, SiteLanguage};
    use crate::options::SimulationOptions;
    use crate::services::InMemorySiteLookup;

    fn fixture() -> (Arc<InMemoryAmbient>, SitePass) {
        let ambient = Arc::new(InMemoryAmbient::new());
        let sites = Arc::new(InMemorySiteLookup::default());
        sites
            .insert(Site::new("main", 1, vec![SiteLanguage::new(0, "en", "English", "en_US.UTF-8")]))
            .unwrap();
        sites.insert(Site::new("shop", 50, Vec::new())).unwrap();
        let pass = SitePass::new(ambient.clone(), sites);
        (ambient, pass)
    }

    fn request(options: SimulationOptions) -> SimulationRequest {
        OptionSchema::new()
            .declare(OptionKey::TargetSiteId)
            .validate(&options)
            .unwrap()
    }

    #[test]
    fn activates_only_for_a_different_site() {
        let (ambient, pass) = fixture();
        assert!(!pass.needs_activation(&request(SimulationOptions::new())).unwrap());
        assert!(pass.needs_activation(&request(SimulationOptions::new().site("main"))).unwrap());

        let token = pass.setup(&request(SimulationOptions::new().site("main"))).unwrap();
        assert!(!pass.needs_activation(&request(SimulationOptions::new().site("main"))).unwrap());
        assert!(pass.needs_activation(&request(SimulationOptions::new().site("shop"))).unwrap());

        pass.rollback(token).unwrap();
        assert!(ambient.current_site().unwrap().is_none());
    }

    #[test]
    fn unknown_site_fails_without_touching_state() {
        let (ambient, pass) = fixture();
        let err = pass
            .setup(&request(SimulationOptions::new().site("missing")))
            .unwrap_err();
        assert!(err.is_resolution());
        assert!(ambient.current_site().unwrap().is_none());
    }

    #[test]
    fn rollback_rejects_foreign_tokens() {
        let (_ambient, pass) = fixture();
        let token = RollbackToken::AdminIdentity { previous: None };
        assert!(pass.rollback(token).is_err());
    }
}
