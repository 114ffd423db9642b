//! Process-wide context: startup state machine and registry.
//!
//! Startup moves `Unconfigured → Validated → Built`, or to `Failed` on any
//! configuration or parameter error. There is no fallback parameter set:
//! a failed startup must abort the process.
//!
//! The built context is shared read-only as `Arc<Context>`. Reconfiguring
//! means building a new context and swapping the `Arc`; a context is never
//! edited in place.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{error, info};

use crate::config::ContextConfig;
use crate::context::{Context, ContextBuilder};
use crate::error::{ConfigurationError, ParameterError, StartupError};
use crate::fingerprint::Fingerprint;
use crate::params::ParameterSet;
use crate::validate::{check, validate};

/// Per-process lifecycle of the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Unconfigured,
    Validated,
    Built,
    Failed,
}

/// Drives the one-shot startup sequence.
#[derive(Debug)]
pub struct Startup {
    state: ProcessState,
}

impl Default for Startup {
    fn default() -> Self {
        Self::new()
    }
}

impl Startup {
    pub fn new() -> Self {
        Self {
            state: ProcessState::Unconfigured,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Load parameters from `source`, validate them and build the context.
    pub fn start<F>(&mut self, source: F) -> Result<ContextRegistry, StartupError>
    where
        F: FnOnce() -> Result<ParameterSet, ConfigurationError>,
    {
        if self.state != ProcessState::Unconfigured {
            return Err(StartupError::AlreadyStarted(self.state));
        }

        let built = source().map_err(StartupError::from).and_then(|params| {
            let validated = check(&params)?;
            self.transition(ProcessState::Validated);
            Ok(ContextBuilder::build(&validated))
        });

        match built {
            Ok(ctx) => {
                self.transition(ProcessState::Built);
                let registry = ContextRegistry::new(ctx);
                let current = registry.current();
                info!(
                    "Context built: {} (fingerprint {})",
                    current,
                    Fingerprint::of(&current).short_hex()
                );
                Ok(registry)
            }
            Err(e) => {
                self.transition(ProcessState::Failed);
                error!("Startup aborted: {}", e);
                Err(e)
            }
        }
    }

    pub fn start_from_config(&mut self, config: &ContextConfig) -> Result<ContextRegistry, StartupError> {
        self.start(|| Ok(config.parameter_set()))
    }

    pub fn start_from_file(&mut self, path: &Path) -> Result<ContextRegistry, StartupError> {
        self.start(|| ContextConfig::load(path).map(|cfg| cfg.parameter_set()))
    }

    fn transition(&mut self, next: ProcessState) {
        info!("Startup: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[derive(Debug)]
struct Slot {
    context: Arc<Context>,
    generation: u64,
}

/// Holds the current process context.
///
/// The context and its generation live under one lock, so a reader never
/// pairs a context with another rebuild's generation.
#[derive(Debug)]
pub struct ContextRegistry {
    slot: RwLock<Slot>,
}

impl ContextRegistry {
    pub fn new(ctx: Context) -> Self {
        Self {
            slot: RwLock::new(Slot {
                context: Arc::new(ctx),
                generation: 0,
            }),
        }
    }

    /// Shared handle to the current context.
    pub fn current(&self) -> Arc<Context> {
        self.snapshot().0
    }

    /// The current context together with its generation.
    pub fn snapshot(&self) -> (Arc<Context>, u64) {
        // Only whole values are ever written under the lock, so a poisoned
        // lock still holds a complete slot.
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        (slot.context.clone(), slot.generation)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.current())
    }

    /// Number of successful rebuilds since startup.
    pub fn generation(&self) -> u64 {
        self.snapshot().1
    }

    /// Validate `params` and swap the result in.
    ///
    /// On error the current context stays in place. Holders of the old
    /// `Arc` keep reading the old context until they drop it.
    pub fn rebuild(&self, params: &ParameterSet) -> Result<Arc<Context>, ParameterError> {
        let next = Arc::new(validate(params)?);
        let generation = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.context = next.clone();
            slot.generation += 1;
            slot.generation
        };
        info!(
            "Context rebuilt (generation {}): {} (fingerprint {})",
            generation,
            next,
            Fingerprint::of(&next).short_hex()
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::SchemeVariant;

    #[test]
    fn successful_startup_reaches_built() {
        let mut startup = Startup::new();
        let registry = startup
            .start(|| Ok(ParameterSet::integer(2048, 1024)))
            .unwrap();
        assert_eq!(startup.state(), ProcessState::Built);
        assert_eq!(registry.current().degree(), 2048);
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn parameter_failure_reaches_failed() {
        let mut startup = Startup::new();
        let err = startup
            .start(|| Ok(ParameterSet::integer(3000, 1024)))
            .unwrap_err();
        assert!(matches!(
            err,
            StartupError::Parameter(ParameterError::UnsupportedDegree(3000))
        ));
        assert_eq!(startup.state(), ProcessState::Failed);
    }

    #[test]
    fn configuration_failure_reaches_failed() {
        let mut startup = Startup::new();
        let err = startup
            .start(|| Err(ConfigurationError::MissingScheme))
            .unwrap_err();
        assert!(matches!(
            err,
            StartupError::Configuration(ConfigurationError::MissingScheme)
        ));
        assert_eq!(startup.state(), ProcessState::Failed);
    }

    #[test]
    fn startup_is_one_shot() {
        let mut startup = Startup::new();
        startup.start(|| Ok(ParameterSet::integer(2048, 1024))).unwrap();
        let err = startup
            .start(|| Ok(ParameterSet::integer(2048, 1024)))
            .unwrap_err();
        assert!(matches!(err, StartupError::AlreadyStarted(ProcessState::Built)));

        let mut failed = Startup::new();
        let _ = failed.start(|| Ok(ParameterSet::integer(3000, 1024)));
        assert!(matches!(
            failed.start(|| Ok(ParameterSet::integer(2048, 1024))),
            Err(StartupError::AlreadyStarted(ProcessState::Failed))
        ));
    }

    #[test]
    fn rebuild_swaps_and_keeps_old_handles() {
        let registry = ContextRegistry::new(validate(&ParameterSet::integer(2048, 1024)).unwrap());
        let old = registry.current();

        let new = registry
            .rebuild(&ParameterSet::real(8192, vec![60, 40, 40, 60]))
            .unwrap();
        assert_eq!(new.variant(), SchemeVariant::Real);
        assert_eq!(registry.current().variant(), SchemeVariant::Real);
        assert_eq!(registry.generation(), 1);

        // The old handle is untouched.
        assert_eq!(old.variant(), SchemeVariant::Integer);
        assert_eq!(old.degree(), 2048);
    }

    #[test]
    fn failed_rebuild_keeps_current() {
        let registry = ContextRegistry::new(validate(&ParameterSet::integer(2048, 1024)).unwrap());
        let before = registry.fingerprint();
        assert!(registry
            .rebuild(&ParameterSet::real(4096, vec![60, 40, 40, 60]))
            .is_err());
        assert_eq!(registry.fingerprint(), before);
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn concurrent_rebuilds_count_every_swap() {
        let integer = ParameterSet::integer(2048, 1024);
        let real = ParameterSet::real(8192, vec![60, 40, 40, 60]);
        let registry = Arc::new(ContextRegistry::new(validate(&integer).unwrap()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                let params = if i % 2 == 0 { integer.clone() } else { real.clone() };
                std::thread::spawn(move || registry.rebuild(&params).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let (last, generation) = registry.snapshot();
        assert_eq!(generation, 8);
        let last = Fingerprint::of(&last);
        assert!(
            last == Fingerprint::of(&validate(&integer).unwrap())
                || last == Fingerprint::of(&validate(&real).unwrap())
        );
    }

    #[test]
    fn concurrent_readers_see_the_same_context() {
        let registry = Arc::new(ContextRegistry::new(
            validate(&ParameterSet::integer(4096, 65537)).unwrap(),
        ));
        let expected = registry.fingerprint();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.fingerprint())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
