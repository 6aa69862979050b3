//! # envsim - Environment Simulation Engine
//!
//! envsim runs a unit of work as if it executed inside a different request
//! environment: another site, page, language, visibility rule set or acting
//! user. The environment is installed by a fixed sequence of passes and torn
//! down in reverse once the work returns, fails or panics.
//!
//! ## Core Concepts
//!
//! - **Ambient context**: process-wide slots ordinary code reads implicitly
//! - **Pass**: one environment aspect with its own setup and rollback
//! - **Simulation request**: validated, immutable options for one call
//! - **Render context**: memoized page rendering state, keyed by page and language
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use envsim::{InMemoryAmbient, InMemoryServices, SimError, SimulationOptions, Simulator};
//!
//! let ambient = Arc::new(InMemoryAmbient::new());
//! let services = InMemoryServices::default();
//! let simulator = Simulator::new(ambient.clone(), services.services())?;
//!
//! let options = SimulationOptions::new()
//!     .site("main")
//!     .page(42)
//!     .language("de")
//!     .fallback_language("default");
//!
//! let title = simulator.run(&options, || {
//!     let context = ambient.render_context()?.expect("render context installed");
//!     Ok::<_, SimError>(context.page.title.clone())
//! })?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod ambient;
pub mod config;
pub mod error;
pub mod options;
pub mod services;

// Engine
pub mod simulation;
pub mod simulator;

// Re-export primary types at crate root for convenience
pub use ambient::{
    AmbientContext, AmbientResult, InMemoryAmbient, LanguageAspect, LanguageService, PageRecord,
    RenderContext, Site, SiteLanguage, UserId, UserIdentity, VisibilityAspect,
};
pub use config::SimulatorConfig;
pub use error::{
    AmbientError, IdentityError, ResolutionError, SimError, SimResult, ValidationError,
};
pub use options::{
    EarlyOptions, FallbackLanguage, LanguageRef, OptionKey, OptionSchema, SimulationOptions,
    SimulationRequest,
};
pub use services::{
    InMemoryServices, NewUser, PageLookup, ServiceError, SimulationServices, SiteLookup,
    UserRecord, UserStore,
};
pub use simulation::{PassKind, PassRegistry, RollbackToken, SimulationPass};
pub use simulator::{SimulationId, Simulator};
