//! Driving a single infrastructure outside any environment.
//!
//! Standalone infrastructures keep the context id they were created with and
//! never take part in configuration exchange.

use errors::EnvironmentError;
use futures_util::future::BoxFuture;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use tb_core::{Configuration, Infrastructure, InfrastructureState};
use tracing::{debug, error, warn};

fn guard_error(operation: &'static str, state: InfrastructureState) -> anyhow::Error {
    EnvironmentError::InvalidState {
        operation,
        state: state.to_string(),
    }
    .into()
}

/// Owns one infrastructure and tracks its lifecycle.
///
/// `start` initializes, `shutdown` destroys. Dropping a still-initialized
/// `Standalone` only logs a warning; async destroy cannot run from `Drop`.
pub struct Standalone<I, C = ()>
where
    I: Infrastructure<C>,
    C: Configuration,
{
    infrastructure: I,
    state: InfrastructureState,
    _configuration: PhantomData<fn() -> C>,
}

impl<I, C> Standalone<I, C>
where
    I: Infrastructure<C>,
    C: Configuration,
{
    pub fn new(infrastructure: I) -> Self {
        Self {
            infrastructure,
            state: InfrastructureState::Unstarted,
            _configuration: PhantomData,
        }
    }

    /// Wraps and initializes in one step.
    pub async fn start(infrastructure: I) -> anyhow::Result<Self> {
        let mut standalone = Self::new(infrastructure);
        standalone.initialize().await?;
        Ok(standalone)
    }

    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        if self.state != InfrastructureState::Unstarted {
            return Err(guard_error("initialize", self.state));
        }
        self.infrastructure.initialize().await?;
        self.state = InfrastructureState::Initialized;
        debug!(
            infrastructure = self.infrastructure.name(),
            context_id = %self.infrastructure.context_id(),
            "standalone infrastructure initialized"
        );
        Ok(())
    }

    pub async fn reset(&mut self) -> anyhow::Result<()> {
        if self.state != InfrastructureState::Initialized {
            return Err(guard_error("reset", self.state));
        }
        self.infrastructure.reset().await
    }

    /// Destroys the infrastructure. A second call is a no-op.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if self.state == InfrastructureState::Destroyed {
            return Ok(());
        }
        self.infrastructure.destroy().await?;
        self.state = InfrastructureState::Destroyed;
        debug!(
            infrastructure = self.infrastructure.name(),
            "standalone infrastructure destroyed"
        );
        Ok(())
    }

    pub fn state(&self) -> InfrastructureState {
        self.state
    }

    pub fn context_id(&self) -> tb_core::ContextId {
        self.infrastructure.context_id()
    }

    pub fn get(&self) -> &I {
        &self.infrastructure
    }

    pub fn get_mut(&mut self) -> &mut I {
        &mut self.infrastructure
    }
}

impl<I, C> Deref for Standalone<I, C>
where
    I: Infrastructure<C>,
    C: Configuration,
{
    type Target = I;

    fn deref(&self) -> &I {
        &self.infrastructure
    }
}

impl<I, C> DerefMut for Standalone<I, C>
where
    I: Infrastructure<C>,
    C: Configuration,
{
    fn deref_mut(&mut self) -> &mut I {
        &mut self.infrastructure
    }
}

impl<I, C> Drop for Standalone<I, C>
where
    I: Infrastructure<C>,
    C: Configuration,
{
    fn drop(&mut self) {
        if self.state == InfrastructureState::Initialized {
            warn!(
                infrastructure = self.infrastructure.name(),
                "standalone infrastructure dropped without shutdown"
            );
        }
    }
}

/// Initializes `infrastructure`, runs `body` against it and always destroys
/// it afterwards.
///
/// An error from `body` wins over a destroy error; the latter is logged.
pub async fn with_infrastructure<I, C, T, F>(infrastructure: I, body: F) -> anyhow::Result<T>
where
    I: Infrastructure<C>,
    C: Configuration,
    F: for<'a> FnOnce(&'a mut I) -> BoxFuture<'a, anyhow::Result<T>>,
{
    let mut standalone = Standalone::<I, C>::new(infrastructure);

    if let Err(e) = standalone.initialize().await {
        if let Err(destroy_err) = standalone.shutdown().await {
            error!(error = %destroy_err, "destroy after failed initialize failed");
        }
        return Err(e);
    }

    let outcome = body(standalone.get_mut()).await;
    let teardown = standalone.shutdown().await;

    match (outcome, teardown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(destroy_err)) => {
            error!(error = %destroy_err, "destroy after failed body failed");
            Err(e)
        }
    }
}
