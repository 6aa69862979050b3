//! The simulation orchestrator.
//!
//! [`Simulator::run`] executes a unit of work as if it happened in another
//! request context, then restores the previous context:
//!
//! 1. Check the two early options; skip simulation entirely if the call is
//!    nested and should defer, or a render context exists and should be kept.
//! 2. Build the request from the option schema of every registered pass.
//! 3. Save the nesting flags and apply this call's suppression request.
//! 4. Set up each pass that needs activation, in registry order. A setup
//!    failure stops activation; already-activated passes are still rolled back.
//! 5. Run the work.
//! 6. Roll back activated passes in reverse order, restore the nesting flags,
//!    and return the work's result.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};
use uuid::Uuid;

use crate::ambient::AmbientContext;
use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::options::{EarlyOptions, OptionKey, SimulationOptions, SimulationRequest};
use crate::services::SimulationServices;
use crate::simulation::{NestingState, PassGuard, PassRegistry, RollbackStack};

/// Stable identifier for one simulation call (for tracing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationId(Uuid);

impl SimulationId {
    /// Create a new random simulation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SimulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a call skipped simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShortCircuit {
    Nested,
    AncestorSuppressed,
    RenderContextExists,
}

impl fmt::Display for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nested => f.write_str("already nested"),
            Self::AncestorSuppressed => f.write_str("ancestor suppressed child simulations"),
            Self::RenderContextExists => f.write_str("render context exists"),
        }
    }
}

/// Runs work inside a simulated environment.
///
/// One simulator is meant to live as long as the ambient context it drives;
/// its render-context cache and nesting flags are tied to that lifetime.
pub struct Simulator {
    ambient: Arc<dyn AmbientContext>,
    services: Option<SimulationServices>,
    config: SimulatorConfig,
    registry: OnceLock<PassRegistry>,
    nesting: NestingState,
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("registry_ready", &self.registry.get().is_some())
            .field("nesting", &self.nesting.snapshot())
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Create a simulator with the standard passes and default config.
    pub fn new(ambient: Arc<dyn AmbientContext>, services: SimulationServices) -> SimResult<Self> {
        Self::with_config(ambient, services, SimulatorConfig::default())
    }

    /// Create a simulator with the standard passes.
    ///
    /// The passes are built on the first call that actually simulates.
    pub fn with_config(
        ambient: Arc<dyn AmbientContext>,
        services: SimulationServices,
        config: SimulatorConfig,
    ) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            ambient,
            services: Some(services),
            config,
            registry: OnceLock::new(),
            nesting: NestingState::default(),
        })
    }

    /// Create a simulator driving a custom pass registry.
    #[must_use]
    pub fn with_registry(ambient: Arc<dyn AmbientContext>, registry: PassRegistry) -> Self {
        Self {
            ambient,
            services: None,
            config: SimulatorConfig::default(),
            registry: OnceLock::from(registry),
            nesting: NestingState::default(),
        }
    }

    /// The ambient context this simulator drives.
    #[must_use]
    pub fn ambient(&self) -> &Arc<dyn AmbientContext> {
        &self.ambient
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Returns true while a call's work is executing.
    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.nesting.in_simulation()
    }

    /// Returns true while a call that suppresses child simulations is active.
    #[must_use]
    pub fn child_simulations_suppressed(&self) -> bool {
        self.nesting.children_suppressed()
    }

    fn registry(&self) -> SimResult<&PassRegistry> {
        if let Some(registry) = self.registry.get() {
            return Ok(registry);
        }
        let services = self
            .services
            .as_ref()
            .ok_or_else(|| SimError::internal("no pass registry and no services to build one"))?;
        Ok(self
            .registry
            .get_or_init(|| PassRegistry::standard(&self.ambient, services, &self.config)))
    }

    fn short_circuit(&self, early: EarlyOptions) -> SimResult<Option<ShortCircuit>> {
        if self.nesting.in_simulation() {
            if early.ignore_when_already_nested {
                return Ok(Some(ShortCircuit::Nested));
            }
            if self.nesting.children_suppressed() {
                return Ok(Some(ShortCircuit::AncestorSuppressed));
            }
        }
        if early.ignore_when_render_context_exists && self.ambient.render_context()?.is_some() {
            return Ok(Some(ShortCircuit::RenderContextExists));
        }
        Ok(None)
    }

    /// Validate `options` against every pass's schema plus the structural options.
    ///
    /// `suppressChildSimulations` defaults to the current suppression flag,
    /// so suppression is inherited by nested calls that do not override it.
    pub fn resolve_request(&self, options: &SimulationOptions) -> SimResult<SimulationRequest> {
        let schema = self
            .registry()?
            .schema()
            .declare_flag(
                OptionKey::SuppressChildSimulations,
                self.nesting.children_suppressed(),
            )
            .declare_flag(OptionKey::IgnoreWhenAlreadyNested, false)
            .declare_flag(OptionKey::IgnoreWhenRenderContextExists, false);
        Ok(schema.validate(options)?)
    }

    /// Run `work` inside the environment described by `options`.
    ///
    /// The work's own error type is passed through untouched; engine errors
    /// are converted into it. Every activated pass is rolled back before this
    /// returns, including when `work` fails or panics.
    pub fn run<T, E, F>(&self, options: &SimulationOptions, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<SimError>,
    {
        if let Some(reason) = self.short_circuit(EarlyOptions::from_options(options))? {
            debug!(%reason, "skipping simulation");
            return work();
        }

        let request = self.resolve_request(options)?;
        let registry = self.registry()?;

        let id = SimulationId::new();
        let span = debug_span!("simulation", %id);
        let _entered = span.enter();
        debug!(?request, "simulation requested");

        let nesting = self.nesting.enter(request.suppress_child_simulations);
        let mut stack = RollbackStack::new();

        let mut setup_error = None;
        for pass in registry.iter() {
            let kind = pass.kind();
            let activated = pass
                .needs_activation(&request)
                .and_then(|needed| needed.then(|| pass.setup(&request)).transpose());
            match activated {
                Ok(Some(token)) => {
                    debug!(pass = %kind, "pass activated");
                    stack.push(PassGuard::new(pass, token));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(pass = %kind, error = %err, "pass setup failed");
                    setup_error = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = setup_error {
            if let Err(rollback_err) = stack.unwind() {
                warn!(error = %rollback_err, "rollback failed after setup fault");
            }
            drop(nesting);
            return Err(err.into());
        }

        nesting.mark_running();
        let outcome = work();
        let rollback = stack.unwind();
        drop(nesting);

        match outcome {
            Ok(value) => {
                rollback?;
                Ok(value)
            }
            Err(work_err) => {
                if let Err(rollback_err) = rollback {
                    warn!(error = %rollback_err, "rollback failed after work error");
                }
                Err(work_err)
            }
        }
    }

    /// Run `work` with options given as a JSON object.
    pub fn run_with<T, E, F>(&self, options: serde_json::Value, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<SimError>,
    {
        let options = SimulationOptions::from_json(options).map_err(SimError::from)?;
        self.run(&options, work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use crate::ambient::InMemoryAmbient;
    use crate::error::ValidationError;
    use crate::simulation::testing::{recording_passes, Journal, RecordingPass};
    use crate::simulation::{PassKind, SimulationPass};

    fn simulator(passes: Vec<RecordingPass>) -> Simulator {
        let passes: Vec<Box<dyn SimulationPass>> = passes
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn SimulationPass>)
            .collect();
        let registry = PassRegistry::new(passes).unwrap();
        Simulator::with_registry(Arc::new(InMemoryAmbient::new()), registry)
    }

    fn events(kinds: &[(&str, PassKind)]) -> Vec<String> {
        kinds
            .iter()
            .map(|(phase, kind)| format!("{phase}:{kind}"))
            .collect()
    }

    #[test]
    fn passes_set_up_in_order_and_roll_back_in_reverse() {
        let journal = Journal::default();
        let sim = simulator(recording_passes(&journal));

        let value = sim
            .run(&SimulationOptions::new(), || {
                journal.record("work".to_string());
                Ok::<_, SimError>(42)
            })
            .unwrap();
        assert_eq!(value, 42);

        let mut expected: Vec<String> = PassKind::ORDER
            .iter()
            .map(|kind| format!("setup:{kind}"))
            .collect();
        expected.push("work".to_string());
        expected.extend(PassKind::ORDER.iter().rev().map(|kind| format!("rollback:{kind}")));
        assert_eq!(journal.events(), expected);
    }

    #[test]
    fn inactive_passes_are_neither_set_up_nor_rolled_back() {
        let journal = Journal::default();
        let sim = simulator(vec![
            RecordingPass::new(PassKind::Site, &journal).inactive(),
            RecordingPass::new(PassKind::Visibility, &journal),
            RecordingPass::new(PassKind::RenderContext, &journal).inactive(),
        ]);

        sim.run(&SimulationOptions::new(), || Ok::<_, SimError>(()))
            .unwrap();
        assert_eq!(
            journal.events(),
            events(&[("setup", PassKind::Visibility), ("rollback", PassKind::Visibility)])
        );
    }

    #[test]
    fn setup_failure_skips_work_and_rolls_back_earlier_passes() {
        let journal = Journal::default();
        let sim = simulator(vec![
            RecordingPass::new(PassKind::Site, &journal),
            RecordingPass::new(PassKind::Visibility, &journal),
            RecordingPass::new(PassKind::Language, &journal).failing_setup(),
            RecordingPass::new(PassKind::RenderContext, &journal),
        ]);

        let mut ran = false;
        let err = sim
            .run(&SimulationOptions::new(), || {
                ran = true;
                Ok::<_, SimError>(())
            })
            .unwrap_err();
        assert!(!ran);
        assert!(matches!(err, SimError::Internal { .. }));
        assert_eq!(
            journal.events(),
            events(&[
                ("setup", PassKind::Site),
                ("setup", PassKind::Visibility),
                ("setup", PassKind::Language),
                ("rollback", PassKind::Visibility),
                ("rollback", PassKind::Site),
            ])
        );
        assert!(!sim.is_simulating());
    }

    #[derive(Debug, PartialEq)]
    enum WorkError {
        Failed(&'static str),
        Sim(String),
    }

    impl From<SimError> for WorkError {
        fn from(err: SimError) -> Self {
            Self::Sim(err.to_string())
        }
    }

    #[test]
    fn work_errors_pass_through_untouched() {
        let journal = Journal::default();
        let sim = simulator(recording_passes(&journal));

        let err = sim
            .run(&SimulationOptions::new(), || Err::<(), _>(WorkError::Failed("boom")))
            .unwrap_err();
        assert_eq!(err, WorkError::Failed("boom"));
        assert_eq!(journal.events().len(), 10);
    }

    #[test]
    fn rollback_failure_surfaces_after_successful_work() {
        let journal = Journal::default();
        let sim = simulator(vec![
            RecordingPass::new(PassKind::Site, &journal),
            RecordingPass::new(PassKind::Language, &journal).failing_rollback(),
            RecordingPass::new(PassKind::RenderContext, &journal),
        ]);

        let err = sim
            .run(&SimulationOptions::new(), || Ok::<_, SimError>(()))
            .unwrap_err();
        let SimError::Rollback { pass, .. } = err else {
            panic!("expected Rollback, got {err:?}");
        };
        assert_eq!(pass, PassKind::Language);
        // The sweep continues past the failing pass.
        assert_eq!(journal.events().last().unwrap(), "rollback:site");
    }

    #[test]
    fn work_error_wins_over_rollback_failure() {
        let journal = Journal::default();
        let sim = simulator(vec![
            RecordingPass::new(PassKind::Site, &journal).failing_rollback(),
        ]);

        let err = sim
            .run(&SimulationOptions::new(), || Err::<(), _>(WorkError::Failed("first")))
            .unwrap_err();
        assert_eq!(err, WorkError::Failed("first"));
    }

    #[test]
    fn panicking_work_still_rolls_back_and_restores_flags() {
        let journal = Journal::default();
        let sim = simulator(recording_passes(&journal));

        let options = SimulationOptions::new().suppress_child_simulations(true);
        let result = catch_unwind(AssertUnwindSafe(|| {
            sim.run(&options, || -> Result<(), SimError> { panic!("work exploded") })
        }));
        assert!(result.is_err());

        let rollbacks: Vec<String> = journal
            .events()
            .into_iter()
            .filter(|e| e.starts_with("rollback:"))
            .collect();
        assert_eq!(rollbacks.len(), 5);
        assert_eq!(rollbacks[0], "rollback:render-context");
        assert!(!sim.is_simulating());
        assert!(!sim.child_simulations_suppressed());
    }

    #[test]
    fn nested_call_can_defer_to_outer_simulation() {
        let journal = Journal::default();
        let sim = simulator(vec![RecordingPass::new(PassKind::Site, &journal)]);

        let inner_options = SimulationOptions::new().ignore_when_already_nested(true);
        sim.run(&SimulationOptions::new(), || {
            assert!(sim.is_simulating());
            sim.run(&inner_options, || {
                journal.record("inner".to_string());
                Ok::<_, SimError>(())
            })
        })
        .unwrap();

        assert_eq!(
            journal.events(),
            vec!["setup:site", "inner", "rollback:site"]
        );
        assert!(!sim.is_simulating());
    }

    #[test]
    fn nested_call_simulates_by_default() {
        let journal = Journal::default();
        let sim = simulator(vec![RecordingPass::new(PassKind::Site, &journal)]);

        sim.run(&SimulationOptions::new(), || {
            sim.run(&SimulationOptions::new(), || Ok::<_, SimError>(()))
        })
        .unwrap();
        assert_eq!(
            journal.events(),
            vec!["setup:site", "setup:site", "rollback:site", "rollback:site"]
        );
    }

    #[test]
    fn suppressing_call_short_circuits_every_child() {
        let journal = Journal::default();
        let sim = simulator(vec![RecordingPass::new(PassKind::Site, &journal)]);

        let outer = SimulationOptions::new().suppress_child_simulations(true);
        sim.run(&outer, || {
            assert!(sim.child_simulations_suppressed());
            sim.run(&SimulationOptions::new(), || {
                journal.record("child".to_string());
                Ok::<_, SimError>(())
            })
        })
        .unwrap();

        assert_eq!(
            journal.events(),
            vec!["setup:site", "child", "rollback:site"]
        );
        assert!(!sim.child_simulations_suppressed());
    }

    #[test]
    fn short_circuit_outside_simulation_is_a_no_op() {
        let journal = Journal::default();
        let sim = simulator(vec![RecordingPass::new(PassKind::Site, &journal)]);

        let options = SimulationOptions::new().ignore_when_already_nested(true);
        sim.run(&options, || Ok::<_, SimError>(())).unwrap();
        assert_eq!(journal.events(), vec!["setup:site", "rollback:site"]);
    }

    #[test]
    fn options_no_pass_declares_are_rejected_before_setup() {
        let journal = Journal::default();
        let sim = simulator(recording_passes(&journal));

        let err = sim
            .run(&SimulationOptions::new().page(3), || Ok::<_, SimError>(()))
            .unwrap_err();
        let SimError::Validation(ValidationError::UndeclaredOption { option }) = err else {
            panic!("expected UndeclaredOption, got {err:?}");
        };
        assert_eq!(option, "targetPageId");
        assert!(journal.events().is_empty());
    }

    #[test]
    fn run_with_parses_json_options() {
        let journal = Journal::default();
        let sim = simulator(recording_passes(&journal));

        let value = sim
            .run_with(serde_json::json!({ "suppressChildSimulations": true }), || {
                Ok::<_, SimError>(sim.child_simulations_suppressed())
            })
            .unwrap();
        assert!(value);

        let err = sim
            .run_with(serde_json::json!({ "targetPage": 1 }), || Ok::<_, SimError>(()))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn custom_registry_is_installed_up_front() {
        let journal = Journal::default();
        let sim = simulator(vec![RecordingPass::new(PassKind::Visibility, &journal)]);
        assert!(format!("{sim:?}").contains("registry_ready: true"));
        assert_eq!(sim.registry().unwrap().kinds(), vec![PassKind::Visibility]);
    }

    #[test]
    fn simulation_ids_are_unique() {
        assert_ne!(SimulationId::new(), SimulationId::new());
    }
}
