//! Infrastructures written against blocking APIs.
//!
//! The environment only drives the async [`Infrastructure`] trait. A type that
//! implements [`BlockingInfrastructure`] is registered wrapped in [`Blocking`],
//! which runs each call inline on the driving task.

use crate::lifecycle::InfrastructureContext;
use crate::traits::{ConfigConsumer, ConfigProducer, Infrastructure};
use crate::types::Configuration;
use async_trait::async_trait;

/// Blocking counterpart of [`Infrastructure`].
pub trait BlockingInfrastructure<C: Configuration = ()>: Send + Sync + 'static {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn order(&self) -> Option<i32> {
        None
    }

    fn context(&self) -> &InfrastructureContext;

    fn context_mut(&mut self) -> &mut InfrastructureContext;

    fn initialize(&mut self) -> anyhow::Result<()>;

    fn reset(&mut self) -> anyhow::Result<()>;

    fn destroy(&mut self) -> anyhow::Result<()>;

    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<C>> {
        None
    }

    fn as_producer(&self) -> Option<&dyn ConfigProducer<C>> {
        None
    }
}

/// Adapter registering a [`BlockingInfrastructure`] as an [`Infrastructure`].
#[derive(Debug, Default)]
pub struct Blocking<T>(pub T);

impl<T> Blocking<T> {
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
impl<C, T> Infrastructure<C> for Blocking<T>
where
    C: Configuration,
    T: BlockingInfrastructure<C>,
{
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn order(&self) -> Option<i32> {
        self.0.order()
    }

    fn context(&self) -> &InfrastructureContext {
        self.0.context()
    }

    fn context_mut(&mut self) -> &mut InfrastructureContext {
        self.0.context_mut()
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        self.0.initialize()
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        self.0.reset()
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        self.0.destroy()
    }

    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<C>> {
        self.0.as_consumer()
    }

    fn as_producer(&self) -> Option<&dyn ConfigProducer<C>> {
        self.0.as_producer()
    }
}
