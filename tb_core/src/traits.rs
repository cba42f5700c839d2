//! Infrastructure contract and configuration capabilities.

use crate::lifecycle::InfrastructureContext;
use crate::types::{Configuration, ContextId};
use async_trait::async_trait;
use std::any::Any;

/// Downcasting support for registered infrastructures.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A test resource that can be initialized, reset between tests and destroyed.
///
/// `C` is the configuration shape shared with the owning environment. An
/// infrastructure that does not care about configuration can implement the
/// trait for every `C: Configuration` and be registered anywhere.
///
/// Callers never run two lifecycle calls on the same instance concurrently.
#[async_trait]
pub trait Infrastructure<C: Configuration = ()>: AsAny + Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Position in the environment's sequence. Lower first, `None` last.
    fn order(&self) -> Option<i32> {
        None
    }

    fn context(&self) -> &InfrastructureContext;

    fn context_mut(&mut self) -> &mut InfrastructureContext;

    fn context_id(&self) -> ContextId {
        self.context().context_id()
    }

    /// Whether the environment resets this infrastructure between tests.
    fn auto_reset(&self) -> bool {
        self.context().auto_reset()
    }

    /// Prepares the resource. Called once in normal flow.
    async fn initialize(&mut self) -> anyhow::Result<()>;

    /// Returns the resource to a known-clean state without releasing it.
    async fn reset(&mut self) -> anyhow::Result<()>;

    /// Releases the resource. Must be a no-op when never initialized and
    /// when called a second time.
    async fn destroy(&mut self) -> anyhow::Result<()>;

    /// Opt-in: accept the environment's configuration before `initialize`.
    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<C>> {
        None
    }

    /// Opt-in: expose configuration to the environment after `initialize`.
    fn as_producer(&self) -> Option<&dyn ConfigProducer<C>> {
        None
    }
}

/// Receives the environment's accumulated configuration right before
/// `initialize`.
pub trait ConfigConsumer<C: Configuration>: Send + Sync {
    fn accept_configuration(&mut self, configuration: C);
}

/// Exposes configuration once `initialize` has returned.
///
/// Whatever the producer wants observed must be in place before `initialize`
/// completes; the environment reads it exactly once, right after.
pub trait ConfigProducer<C: Configuration>: Send + Sync {
    fn produced_configuration(&self) -> C;
}
