//! # Environment
//!
//! Ordered lifecycle driver for a set of infrastructures.
//!
//! # State Machine
//! `Unconfigured -> Configuring -> Configured -> Initializing -> Ready`,
//! `Ready -> Resetting -> Ready` any number of times, then
//! `Destroying -> Destroyed`. Any lifecycle failure moves to `Failed`, from
//! which only `destroy` is accepted.
//!
//! # Ordering
//! Infrastructures are visited by ascending `order()`, `None` last, ties in
//! registration order. The sequence is computed once, when the configure hook
//! has run, and reused by initialize, reset and destroy.

use crate::setup::{EnvironmentConfig, EnvironmentSetup};
use config::{EnvironmentSettings, TeardownOrder};
use errors::EnvironmentError;
use tb_core::{Configuration, ContextId, Infrastructure, InfrastructureState};
use tracing::{debug, error, info, warn};

/// Identity of an environment. Every registered infrastructure carries it as
/// its context id.
pub type EnvironmentId = ContextId;

const CONFIGURE_HOOK: &str = "EnvironmentSetup::configure_environment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    Unconfigured,
    Configuring,
    Configured,
    Initializing,
    Ready,
    Resetting,
    Destroying,
    Destroyed,
    Failed,
}

impl std::fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configuring => "configuring",
            Self::Configured => "configured",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Resetting => "resetting",
            Self::Destroying => "destroying",
            Self::Destroyed => "destroyed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

fn invalid_state(operation: &'static str, state: EnvironmentState) -> anyhow::Error {
    EnvironmentError::InvalidState {
        operation,
        state: state.to_string(),
    }
    .into()
}

struct Entry<C: Configuration> {
    infrastructure: Box<dyn Infrastructure<C>>,
    state: InfrastructureState,
}

/// A composed set of infrastructures sharing one configuration of shape `C`.
///
/// Use `Environment<()>` (the default) when infrastructures exchange no
/// configuration, `Environment<ConfigMap>` for key-wise merged string
/// configuration, or a custom `Configuration` struct where the last producer
/// wins wholesale.
///
/// One environment must not be driven from two tasks at once; every lifecycle
/// method takes `&mut self`.
pub struct Environment<C: Configuration = ()> {
    id: EnvironmentId,
    state: EnvironmentState,
    settings: EnvironmentSettings,
    setup: Option<Box<dyn EnvironmentSetup<C>>>,
    entries: Vec<Entry<C>>,
    sequence: Vec<usize>,
    configuration: C,
}

impl<C: Configuration> Environment<C> {
    pub fn new(setup: impl EnvironmentSetup<C> + 'static) -> Self {
        Self::with_settings(setup, EnvironmentSettings::default())
    }

    pub fn with_settings(
        setup: impl EnvironmentSetup<C> + 'static,
        settings: EnvironmentSettings,
    ) -> Self {
        Self {
            id: EnvironmentId::new(),
            state: EnvironmentState::Unconfigured,
            settings,
            setup: Some(Box::new(setup)),
            entries: Vec::new(),
            sequence: Vec::new(),
            configuration: C::default(),
        }
    }

    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    pub fn state(&self) -> EnvironmentState {
        self.state
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    /// The accumulated environment-wide configuration.
    pub fn configuration(&self) -> &C {
        &self.configuration
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Infrastructure names in visiting order.
    pub fn sequence(&self) -> Vec<&'static str> {
        self.sequence
            .iter()
            .map(|&index| self.entries[index].infrastructure.name())
            .collect()
    }

    /// Runs the configure hook and registers what it added. A no-op once the
    /// hook has run.
    pub async fn configure(&mut self) -> anyhow::Result<()> {
        match self.state {
            EnvironmentState::Unconfigured => {}
            EnvironmentState::Destroyed => return Err(invalid_state("configure", self.state)),
            _ => return Ok(()),
        }

        let Some(setup) = self.setup.take() else {
            return Err(invalid_state("configure", self.state));
        };

        self.state = EnvironmentState::Configuring;
        let mut config = EnvironmentConfig::new();
        if let Err(e) = setup.configure_environment(&mut config).await {
            self.state = EnvironmentState::Failed;
            error!(environment_id = %self.id, error = %e, "environment configure hook failed");
            return Err(e);
        }

        let (infrastructures, configuration) = config.into_parts();
        if let Some(configuration) = configuration {
            self.configuration = configuration;
        }
        for mut infrastructure in infrastructures {
            infrastructure.context_mut().set_context_id(self.id);
            debug!(
                environment_id = %self.id,
                infrastructure = infrastructure.name(),
                order = ?infrastructure.order(),
                "infrastructure registered"
            );
            self.entries.push(Entry {
                infrastructure,
                state: InfrastructureState::Unstarted,
            });
        }

        self.sequence = visiting_order(&self.entries);
        self.state = EnvironmentState::Configured;
        info!(
            environment_id = %self.id,
            infrastructures = self.entries.len(),
            "environment configured"
        );
        Ok(())
    }

    /// Configures if needed, then initializes every infrastructure in order.
    ///
    /// Stops at the first failure and returns that error unchanged. What was
    /// initialized before it stays initialized unless
    /// `destroy_on_failed_initialize` is set.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        match self.state {
            EnvironmentState::Unconfigured => self.configure().await?,
            EnvironmentState::Configured => {}
            other => return Err(invalid_state("initialize", other)),
        }

        self.state = EnvironmentState::Initializing;
        info!(environment_id = %self.id, "initializing environment");

        for position in 0..self.sequence.len() {
            let index = self.sequence[position];
            if let Err(e) = self.initialize_entry(index).await {
                self.state = EnvironmentState::Failed;
                error!(
                    environment_id = %self.id,
                    infrastructure = self.entries[index].infrastructure.name(),
                    error = %e,
                    "infrastructure initialization failed"
                );
                if self.settings.destroy_on_failed_initialize {
                    let attempted = self.sequence[..=position].to_vec();
                    self.rollback(&attempted).await;
                }
                return Err(e);
            }
        }

        self.state = EnvironmentState::Ready;
        info!(environment_id = %self.id, "environment ready");
        Ok(())
    }

    async fn initialize_entry(&mut self, index: usize) -> anyhow::Result<()> {
        let entry = &mut self.entries[index];

        if let Some(consumer) = entry.infrastructure.as_consumer() {
            consumer.accept_configuration(self.configuration.clone());
            debug!(
                environment_id = %self.id,
                infrastructure = entry.infrastructure.name(),
                "configuration injected"
            );
        }

        entry.infrastructure.initialize().await?;
        entry.state = InfrastructureState::Initialized;

        if let Some(producer) = entry.infrastructure.as_producer() {
            self.configuration.merge_from(producer.produced_configuration());
            debug!(
                environment_id = %self.id,
                infrastructure = entry.infrastructure.name(),
                "configuration merged"
            );
        }

        debug!(
            environment_id = %self.id,
            infrastructure = entry.infrastructure.name(),
            "infrastructure initialized"
        );
        Ok(())
    }

    /// Resets every infrastructure with auto reset enabled, in order.
    ///
    /// Configuration is not re-injected.
    pub async fn reset(&mut self) -> anyhow::Result<()> {
        if self.state != EnvironmentState::Ready {
            return Err(invalid_state("reset", self.state));
        }

        self.state = EnvironmentState::Resetting;
        for position in 0..self.sequence.len() {
            let entry = &mut self.entries[self.sequence[position]];
            if !entry.infrastructure.auto_reset() {
                debug!(
                    environment_id = %self.id,
                    infrastructure = entry.infrastructure.name(),
                    "auto reset disabled, skipping"
                );
                continue;
            }
            if let Err(e) = entry.infrastructure.reset().await {
                error!(
                    environment_id = %self.id,
                    infrastructure = entry.infrastructure.name(),
                    error = %e,
                    "infrastructure reset failed"
                );
                self.state = EnvironmentState::Failed;
                return Err(e);
            }
        }

        self.state = EnvironmentState::Ready;
        debug!(environment_id = %self.id, "environment reset");
        Ok(())
    }

    /// Destroys every registered infrastructure not destroyed yet.
    ///
    /// Accepted from any state and idempotent: a second call is a no-op, and
    /// a call after a failed destroy resumes with what is left.
    pub async fn destroy(&mut self) -> anyhow::Result<()> {
        match self.state {
            EnvironmentState::Destroyed => return Ok(()),
            EnvironmentState::Unconfigured => {
                self.setup = None;
                self.state = EnvironmentState::Destroyed;
                return Ok(());
            }
            _ => {}
        }

        self.state = EnvironmentState::Destroying;
        info!(environment_id = %self.id, "destroying environment");

        for index in self.teardown_sequence(&self.sequence) {
            let entry = &mut self.entries[index];
            if entry.state == InfrastructureState::Destroyed {
                continue;
            }
            if let Err(e) = entry.infrastructure.destroy().await {
                error!(
                    environment_id = %self.id,
                    infrastructure = entry.infrastructure.name(),
                    error = %e,
                    "infrastructure destroy failed"
                );
                self.state = EnvironmentState::Failed;
                return Err(e);
            }
            entry.state = InfrastructureState::Destroyed;
        }

        self.state = EnvironmentState::Destroyed;
        info!(environment_id = %self.id, "environment destroyed");
        Ok(())
    }

    /// Best-effort destroy of the infrastructures visited by a failed
    /// initialize, the failing one included.
    async fn rollback(&mut self, attempted: &[usize]) {
        for index in self.teardown_sequence(attempted) {
            let entry = &mut self.entries[index];
            if entry.state == InfrastructureState::Destroyed {
                continue;
            }
            match entry.infrastructure.destroy().await {
                Ok(()) => entry.state = InfrastructureState::Destroyed,
                Err(e) => warn!(
                    environment_id = %self.id,
                    infrastructure = entry.infrastructure.name(),
                    error = %e,
                    "rollback destroy failed"
                ),
            }
        }
    }

    fn teardown_sequence(&self, sequence: &[usize]) -> Vec<usize> {
        match self.settings.teardown_order {
            TeardownOrder::Setup => sequence.to_vec(),
            TeardownOrder::Reverse => sequence.iter().rev().copied().collect(),
        }
    }

    /// The single registered infrastructure of type `T`.
    ///
    /// Fails with `InfrastructureNotFound` when none is registered (including
    /// before the configure hook has run) and `AmbiguousInfrastructure` when
    /// several are; use [`infrastructures_of`](Self::infrastructures_of) for
    /// the latter case.
    pub fn get_infrastructure<T: Infrastructure<C>>(&self) -> Result<&T, EnvironmentError> {
        let mut matches = self.infrastructures_of::<T>();
        let first = matches.next().ok_or_else(not_found::<T>)?;
        let others = matches.count();
        if others > 0 {
            return Err(EnvironmentError::AmbiguousInfrastructure {
                type_name: std::any::type_name::<T>(),
                count: others + 1,
            });
        }
        Ok(first)
    }

    pub fn get_infrastructure_mut<T: Infrastructure<C>>(
        &mut self,
    ) -> Result<&mut T, EnvironmentError> {
        match self.infrastructures_of::<T>().count() {
            0 => return Err(not_found::<T>()),
            1 => {}
            count => {
                return Err(EnvironmentError::AmbiguousInfrastructure {
                    type_name: std::any::type_name::<T>(),
                    count,
                });
            }
        }
        self.entries
            .iter_mut()
            .find_map(|entry| (*entry.infrastructure).as_any_mut().downcast_mut::<T>())
            .ok_or_else(not_found::<T>)
    }

    /// Every registered infrastructure of type `T`, in registration order.
    pub fn infrastructures_of<T: Infrastructure<C>>(&self) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .filter_map(|entry| (*entry.infrastructure).as_any().downcast_ref::<T>())
    }
}

fn not_found<T>() -> EnvironmentError {
    EnvironmentError::InfrastructureNotFound {
        type_name: std::any::type_name::<T>(),
        hook: CONFIGURE_HOOK,
    }
}

fn visiting_order<C: Configuration>(entries: &[Entry<C>]) -> Vec<usize> {
    let mut sequence: Vec<usize> = (0..entries.len()).collect();
    sequence.sort_by_key(|&index| {
        let order = entries[index].infrastructure.order();
        (order.is_none(), order)
    });
    sequence
}

impl<C: Configuration> Drop for Environment<C> {
    fn drop(&mut self) {
        let live = self
            .entries
            .iter()
            .filter(|entry| entry.state == InfrastructureState::Initialized)
            .count();
        if live > 0 {
            warn!(
                environment_id = %self.id,
                live,
                "environment dropped without destroy, initialized infrastructures were not released"
            );
        }
    }
}
