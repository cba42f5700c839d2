//! The configure hook and the registration surface it receives.

use async_trait::async_trait;
use tb_core::{Configuration, Infrastructure};

/// Describes what a concrete environment is made of.
///
/// Runs exactly once, before the first lifecycle call. Consuming `self` lets
/// the implementation move the infrastructures (and any test doubles it was
/// constructed with) into the environment.
#[async_trait]
pub trait EnvironmentSetup<C: Configuration = ()>: Send + Sync {
    async fn configure_environment(
        self: Box<Self>,
        config: &mut EnvironmentConfig<C>,
    ) -> anyhow::Result<()>;
}

/// Infrastructures and seed configuration collected by the configure hook.
pub struct EnvironmentConfig<C: Configuration = ()> {
    infrastructures: Vec<Box<dyn Infrastructure<C>>>,
    configuration: Option<C>,
}

impl<C: Configuration> EnvironmentConfig<C> {
    pub(crate) fn new() -> Self {
        Self {
            infrastructures: Vec::new(),
            configuration: None,
        }
    }

    /// Register an infrastructure. Registration order breaks ties between
    /// equal orders.
    pub fn add_infrastructure<I: Infrastructure<C>>(&mut self, infrastructure: I) -> &mut Self {
        self.infrastructures.push(Box::new(infrastructure));
        self
    }

    pub fn add_boxed(&mut self, infrastructure: Box<dyn Infrastructure<C>>) -> &mut Self {
        self.infrastructures.push(infrastructure);
        self
    }

    /// Seed the environment-wide configuration handed to the first consumer.
    pub fn with_configuration(&mut self, configuration: C) -> &mut Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn configuration_mut(&mut self) -> &mut C {
        self.configuration.get_or_insert_with(C::default)
    }

    pub fn len(&self) -> usize {
        self.infrastructures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infrastructures.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<Box<dyn Infrastructure<C>>>, Option<C>) {
        (self.infrastructures, self.configuration)
    }
}

/// Configure hook backed by a closure.
pub struct SetupFn<F>(F);

/// Build a configure hook from a closure, for environments that need no
/// async work to describe themselves.
pub fn setup_fn<C, F>(f: F) -> SetupFn<F>
where
    C: Configuration,
    F: FnOnce(&mut EnvironmentConfig<C>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    SetupFn(f)
}

#[async_trait]
impl<C, F> EnvironmentSetup<C> for SetupFn<F>
where
    C: Configuration,
    F: FnOnce(&mut EnvironmentConfig<C>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn configure_environment(
        self: Box<Self>,
        config: &mut EnvironmentConfig<C>,
    ) -> anyhow::Result<()> {
        let SetupFn(f) = *self;
        f(config)
    }
}
