//! Instrumented passes for ordering and fault tests.

use std::sync::{Arc, Mutex};

use crate::ambient::VisibilityAspect;
use crate::error::{SimError, SimResult};
use crate::options::{OptionSchema, SimulationRequest};

use super::pass::{PassKind, RollbackToken, SimulationPass};

/// Shared, ordered log of pass events.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn token_for(kind: PassKind) -> RollbackToken {
    match kind {
        PassKind::Site => RollbackToken::Site { previous: None },
        PassKind::AdminIdentity => RollbackToken::AdminIdentity { previous: None },
        PassKind::Visibility => RollbackToken::Visibility {
            previous: VisibilityAspect::default(),
        },
        PassKind::Language => RollbackToken::Language {
            aspect: None,
            service: None,
        },
        PassKind::RenderContext => RollbackToken::RenderContext {
            previous: None,
            language: None,
        },
    }
}

/// Pass that only records what happens to it.
pub(crate) struct RecordingPass {
    kind: PassKind,
    journal: Journal,
    active: bool,
    fail_setup: bool,
    fail_rollback: bool,
}

impl RecordingPass {
    pub(crate) fn new(kind: PassKind, journal: &Journal) -> Self {
        Self {
            kind,
            journal: journal.clone(),
            active: true,
            fail_setup: false,
            fail_rollback: false,
        }
    }

    pub(crate) fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub(crate) fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub(crate) fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }
}

impl SimulationPass for RecordingPass {
    fn kind(&self) -> PassKind {
        self.kind
    }

    fn declare_options(&self, schema: OptionSchema) -> OptionSchema {
        schema
    }

    fn needs_activation(&self, _request: &SimulationRequest) -> SimResult<bool> {
        Ok(self.active)
    }

    fn setup(&self, _request: &SimulationRequest) -> SimResult<RollbackToken> {
        self.journal.record(format!("setup:{}", self.kind));
        if self.fail_setup {
            return Err(SimError::internal(format!("{} setup failed", self.kind)));
        }
        Ok(token_for(self.kind))
    }

    fn rollback(&self, _token: RollbackToken) -> SimResult<()> {
        self.journal.record(format!("rollback:{}", self.kind));
        if self.fail_rollback {
            return Err(SimError::internal(format!("{} rollback failed", self.kind)));
        }
        Ok(())
    }
}

/// All five kinds, in order, recording into `journal`.
pub(crate) fn recording_passes(journal: &Journal) -> Vec<RecordingPass> {
    PassKind::ORDER
        .into_iter()
        .map(|kind| RecordingPass::new(kind, journal))
        .collect()
}
