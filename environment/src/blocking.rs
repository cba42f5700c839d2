//! Synchronous flavor of [`Environment`] for non-async test harnesses.

use crate::environment::{Environment, EnvironmentId, EnvironmentState};
use crate::setup::EnvironmentSetup;
use config::EnvironmentSettings;
use errors::EnvironmentError;
use tb_core::{Configuration, Infrastructure};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

/// Drives an [`Environment`] on a private tokio runtime.
///
/// Infrastructures stay async; the runtime is sized by
/// `EnvironmentSettings::blocking_worker_threads` (one thread means a
/// current-thread runtime). Must not be used from inside another runtime.
///
/// Dropping a `BlockingEnvironment` destroys whatever is still live.
pub struct BlockingEnvironment<C: Configuration = ()> {
    environment: Environment<C>,
    runtime: Runtime,
}

impl<C: Configuration> BlockingEnvironment<C> {
    pub fn new(setup: impl EnvironmentSetup<C> + 'static) -> anyhow::Result<Self> {
        Self::with_settings(setup, EnvironmentSettings::default())
    }

    pub fn with_settings(
        setup: impl EnvironmentSetup<C> + 'static,
        settings: EnvironmentSettings,
    ) -> anyhow::Result<Self> {
        let runtime = build_runtime(settings.blocking_worker_threads)?;
        Ok(Self {
            environment: Environment::with_settings(setup, settings),
            runtime,
        })
    }

    /// Builds the environment and initializes it in one call.
    pub fn start(setup: impl EnvironmentSetup<C> + 'static) -> anyhow::Result<Self> {
        let mut environment = Self::new(setup)?;
        environment.initialize()?;
        Ok(environment)
    }

    pub fn configure(&mut self) -> anyhow::Result<()> {
        self.runtime.block_on(self.environment.configure())
    }

    pub fn initialize(&mut self) -> anyhow::Result<()> {
        self.runtime.block_on(self.environment.initialize())
    }

    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.runtime.block_on(self.environment.reset())
    }

    pub fn destroy(&mut self) -> anyhow::Result<()> {
        self.runtime.block_on(self.environment.destroy())
    }

    pub fn id(&self) -> EnvironmentId {
        self.environment.id()
    }

    pub fn state(&self) -> EnvironmentState {
        self.environment.state()
    }

    pub fn configuration(&self) -> &C {
        self.environment.configuration()
    }

    pub fn get_infrastructure<T: Infrastructure<C>>(&self) -> Result<&T, EnvironmentError> {
        self.environment.get_infrastructure::<T>()
    }

    pub fn get_infrastructure_mut<T: Infrastructure<C>>(
        &mut self,
    ) -> Result<&mut T, EnvironmentError> {
        self.environment.get_infrastructure_mut::<T>()
    }

    pub fn environment(&self) -> &Environment<C> {
        &self.environment
    }

    /// Runs a future on the environment's runtime, e.g. to call async
    /// helpers of a looked-up infrastructure.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn build_runtime(worker_threads: usize) -> std::io::Result<Runtime> {
    debug!(worker_threads, "building blocking environment runtime");
    if worker_threads <= 1 {
        Builder::new_current_thread().enable_all().build()
    } else {
        Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()
    }
}

impl<C: Configuration> Drop for BlockingEnvironment<C> {
    fn drop(&mut self) {
        if self.environment.state() == EnvironmentState::Destroyed {
            return;
        }
        if Handle::try_current().is_ok() {
            warn!(
                environment_id = %self.environment.id(),
                "blocking environment dropped inside an async runtime, skipping destroy"
            );
            return;
        }
        if let Err(e) = self.runtime.block_on(self.environment.destroy()) {
            warn!(
                environment_id = %self.environment.id(),
                error = %e,
                "destroy on drop failed"
            );
        }
    }
}
