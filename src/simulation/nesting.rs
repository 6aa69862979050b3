//! Nested-invocation flags.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flags shared by every call on one simulator.
#[derive(Debug, Default)]
pub struct NestingState {
    in_simulation: AtomicBool,
    children_suppressed: AtomicBool,
}

/// Saved flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestingSnapshot {
    /// A call's work is executing.
    pub in_simulation: bool,
    /// A call requested that nested calls defer to it.
    pub children_suppressed: bool,
}

impl NestingState {
    /// Returns true while any call's work is executing.
    #[must_use]
    pub fn in_simulation(&self) -> bool {
        self.in_simulation.load(Ordering::Acquire)
    }

    /// Returns true while a suppressing call is active.
    #[must_use]
    pub fn children_suppressed(&self) -> bool {
        self.children_suppressed.load(Ordering::Acquire)
    }

    /// Current flag values.
    #[must_use]
    pub fn snapshot(&self) -> NestingSnapshot {
        NestingSnapshot {
            in_simulation: self.in_simulation(),
            children_suppressed: self.children_suppressed(),
        }
    }

    /// Save the flags and apply this call's suppression request.
    ///
    /// The returned guard restores the saved values when dropped.
    pub fn enter(&self, suppress_children: bool) -> NestingGuard<'_> {
        let saved = self.snapshot();
        self.children_suppressed
            .store(suppress_children, Ordering::Release);
        NestingGuard { state: self, saved }
    }
}

/// Restores the nesting flags on drop.
#[derive(Debug)]
pub struct NestingGuard<'a> {
    state: &'a NestingState,
    saved: NestingSnapshot,
}

impl NestingGuard<'_> {
    /// Mark that work is about to run.
    pub fn mark_running(&self) {
        self.state.in_simulation.store(true, Ordering::Release);
    }

    /// Flags that will be restored.
    #[must_use]
    pub const fn saved(&self) -> NestingSnapshot {
        self.saved
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .in_simulation
            .store(self.saved.in_simulation, Ordering::Release);
        self.state
            .children_suppressed
            .store(self.saved.children_suppressed, Ordering::Release);
    }
}
