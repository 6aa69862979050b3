//! Ordered pass registry.

use std::sync::Arc;

use crate::ambient::AmbientContext;
use crate::config::SimulatorConfig;
use crate::error::ValidationError;
use crate::options::OptionSchema;
use crate::services::SimulationServices;

use super::pass::{PassKind, SimulationPass};
use super::passes::{AdminIdentityPass, LanguagePass, RenderContextPass, SitePass, VisibilityPass};

/// Passes in the order they set up.
///
/// Order is a correctness invariant: the language pass reads the site the
/// site pass installed, the render pass reads the language the language pass
/// installed. Construction rejects lists that break [`PassKind::ORDER`].
pub struct PassRegistry {
    passes: Vec<Box<dyn SimulationPass>>,
}

impl PassRegistry {
    /// Build a registry from passes already in registry order.
    ///
    /// Each kind may appear at most once.
    pub fn new(passes: Vec<Box<dyn SimulationPass>>) -> Result<Self, ValidationError> {
        for pair in passes.windows(2) {
            let (previous, kind) = (pair[0].kind(), pair[1].kind());
            if kind <= previous {
                return Err(ValidationError::PassOrder { kind, previous });
            }
        }
        Ok(Self { passes })
    }

    /// The five standard passes wired to `ambient` and `services`.
    #[must_use]
    pub fn standard(
        ambient: &Arc<dyn AmbientContext>,
        services: &SimulationServices,
        config: &SimulatorConfig,
    ) -> Self {
        let passes: Vec<Box<dyn SimulationPass>> = vec![
            Box::new(SitePass::new(Arc::clone(ambient), Arc::clone(&services.sites))),
            Box::new(AdminIdentityPass::new(
                Arc::clone(ambient),
                Arc::clone(&services.users),
                config.admin_username.clone(),
            )),
            Box::new(VisibilityPass::new(Arc::clone(ambient))),
            Box::new(LanguagePass::new(
                Arc::clone(ambient),
                config.default_language_key.clone(),
                config.max_language_fallback_depth,
            )),
            Box::new(RenderContextPass::new(Arc::clone(ambient), Arc::clone(&services.pages))),
        ];
        Self { passes }
    }

    /// Passes in setup order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SimulationPass> {
        self.passes.iter().map(|p| p.as_ref())
    }

    /// Kinds in setup order.
    #[must_use]
    pub fn kinds(&self) -> Vec<PassKind> {
        self.passes.iter().map(|p| p.kind()).collect()
    }

    /// Fold every pass's option declarations into one schema.
    #[must_use]
    pub fn schema(&self) -> OptionSchema {
        self.passes
            .iter()
            .fold(OptionSchema::new(), |schema, pass| pass.declare_options(schema))
    }

    /// Number of registered passes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns true if no passes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}
