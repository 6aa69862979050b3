//! Simulation passes and the machinery that drives them.
//!
//! A pass owns one ambient override. The [`PassRegistry`] fixes the order
//! passes set up in; [`RollbackStack`] releases activated passes in reverse;
//! [`NestingState`] tracks whether a call's work is running and whether
//! nested calls should defer to it.

pub mod nesting;
pub mod pass;
pub mod passes;
pub mod registry;
pub mod render_cache;
pub mod rollback;

#[cfg(test)]
pub(crate) mod testing;

pub use nesting::{NestingGuard, NestingSnapshot, NestingState};
pub use pass::{PassKind, RollbackToken, SimulationPass};
pub use passes::{
    content_fallback_chain, resolve_language, AdminIdentityPass, LanguagePass, RenderContextPass,
    SitePass, VisibilityPass,
};
pub use registry::PassRegistry;
pub use render_cache::{RenderCacheKey, RenderContextCache};
pub use rollback::{PassGuard, RollbackStack};
