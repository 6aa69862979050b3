//! Visibility pass: swaps the record visibility aspect.

use std::sync::Arc;

use tracing::debug;

use crate::ambient::{AmbientContext, VisibilityAspect};
use crate::error::SimResult;
use crate::options::{OptionKey, OptionSchema, SimulationRequest};
use crate::simulation::pass::{token_mismatch, PassKind, RollbackToken, SimulationPass};

fn requested(request: &SimulationRequest) -> VisibilityAspect {
    VisibilityAspect {
        include_hidden_pages: request.include_hidden_pages,
        include_hidden_content: request.include_hidden_content,
        include_deleted_records: request.include_deleted_records,
    }
}

/// Installs the visibility rules described by the three `include*` flags.
pub struct VisibilityPass {
    ambient: Arc<dyn AmbientContext>,
}

impl VisibilityPass {
    /// Create the pass.
    #[must_use]
    pub fn new(ambient: Arc<dyn AmbientContext>) -> Self {
        Self { ambient }
    }
}

impl SimulationPass for VisibilityPass {
    fn kind(&self) -> PassKind {
        PassKind::Visibility
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema
            .declare_flag(OptionKey::IncludeHiddenPages, false)
            .declare_flag(OptionKey::IncludeHiddenContent, false)
            .declare_flag(OptionKey::IncludeDeletedRecords, false)
    }

    fn needs_activation(&self, request: &SimulationRequest) -> SimResult<bool> {
        Ok(self.ambient.visibility()? != requested(request))
    }

    fn setup(&self, request: &SimulationRequest) -> SimResult<RollbackToken> {
        let previous = self.ambient.visibility()?;
        let next = requested(request);
        debug!(?next, "switching visibility aspect");
        self.ambient.set_visibility(next)?;
        Ok(RollbackToken::Visibility { previous })
    }

    fn rollback(&self, token: RollbackToken) -> SimResult<()> {
        let RollbackToken::Visibility { previous } = token else {
            return Err(token_mismatch(PassKind::Visibility, &token));
        };
        self.ambient.set_visibility(previous)?;
        Ok(())
    }
}
