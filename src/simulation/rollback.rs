//! Rollback guards.
//!
//! Every activated pass is represented by a [`PassGuard`] owning its token.
//! Guards live on a [`RollbackStack`] that releases them in reverse order,
//! either explicitly through [`RollbackStack::unwind`] or, when a panic
//! unwinds through the simulator, from `Drop`.

use tracing::{debug, error, warn};

use crate::error::{SimError, SimResult};

use super::pass::{RollbackToken, SimulationPass};

/// Guard whose release rolls back one activated pass.
pub struct PassGuard<'r> {
    pass: &'r dyn SimulationPass,
    token: Option<RollbackToken>,
}

impl<'r> PassGuard<'r> {
    /// Guard a token produced by `pass`.
    pub fn new(pass: &'r dyn SimulationPass, token: RollbackToken) -> Self {
        Self {
            pass,
            token: Some(token),
        }
    }

    /// Roll back now, consuming the token.
    pub fn release(mut self) -> SimResult<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> SimResult<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        let kind = self.pass.kind();
        debug!(pass = %kind, "rolling back pass");
        self.pass
            .rollback(token)
            .map_err(|e| SimError::rollback(kind, e))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.token.is_none() {
            return;
        }
        if let Err(err) = self.release_inner() {
            error!(error = %err, "rollback failed while unwinding");
        }
    }
}

/// Activated passes, released last-in first-out.
#[derive(Default)]
pub struct RollbackStack<'r> {
    guards: Vec<PassGuard<'r>>,
}

impl<'r> RollbackStack<'r> {
    /// Empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Record an activated pass.
    pub fn push(&mut self, guard: PassGuard<'r>) {
        self.guards.push(guard);
    }

    /// Number of guards still held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns true if no guards are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Release every guard in reverse order.
    ///
    /// A failed rollback never stops the sweep. The first failure is
    /// returned once all guards have been released; later ones are logged.
    pub fn unwind(mut self) -> SimResult<()> {
        let mut first: Option<SimError> = None;
        while let Some(guard) = self.guards.pop() {
            if let Err(err) = guard.release() {
                if first.is_none() {
                    first = Some(err);
                } else {
                    warn!(error = %err, "additional rollback failure");
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for RollbackStack<'_> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
