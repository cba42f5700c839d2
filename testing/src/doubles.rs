//! Infrastructure double that records every lifecycle call.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tb_core::{
    ConfigConsumer, ConfigMap, ConfigProducer, ContextId, Infrastructure, InfrastructureContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Initialize,
    Reset,
    Destroy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub infrastructure: &'static str,
    pub phase: Phase,
    pub context_id: ContextId,
}

/// Shared, ordered log of lifecycle calls. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LifecycleEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: LifecycleEvent) {
        self.lock().push(event);
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.lock().clone()
    }

    /// `(infrastructure, phase)` pairs in call order.
    pub fn calls(&self) -> Vec<(&'static str, Phase)> {
        self.lock()
            .iter()
            .map(|event| (event.infrastructure, event.phase))
            .collect()
    }

    /// Infrastructure names that went through `phase`, in call order.
    pub fn names_for(&self, phase: Phase) -> Vec<&'static str> {
        self.lock()
            .iter()
            .filter(|event| event.phase == phase)
            .map(|event| event.infrastructure)
            .collect()
    }

    pub fn count(&self, infrastructure: &str, phase: Phase) -> usize {
        self.lock()
            .iter()
            .filter(|event| event.infrastructure == infrastructure && event.phase == phase)
            .count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Configurable fake: records calls into an [`EventLog`], optionally
/// consumes and produces a [`ConfigMap`], and can be told to fail a phase.
pub struct RecordingInfrastructure {
    label: &'static str,
    order: Option<i32>,
    context: InfrastructureContext,
    log: EventLog,
    consumes: bool,
    produces: Option<ConfigMap>,
    received: Option<ConfigMap>,
    fail_on: Option<Phase>,
}

impl RecordingInfrastructure {
    pub fn new(label: &'static str, log: &EventLog) -> Self {
        Self {
            label,
            order: None,
            context: InfrastructureContext::new(),
            log: log.clone(),
            consumes: false,
            produces: None,
            received: None,
            fail_on: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.context.set_auto_reset(auto_reset);
        self
    }

    /// Accept the environment's configuration before initialize.
    pub fn consuming(mut self) -> Self {
        self.consumes = true;
        self
    }

    /// Publish `configuration` once initialized.
    pub fn producing(mut self, configuration: ConfigMap) -> Self {
        self.produces = Some(configuration);
        self
    }

    pub fn failing_on(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Configuration handed over by the environment, if any.
    pub fn received(&self) -> Option<&ConfigMap> {
        self.received.as_ref()
    }

    fn record(&self, phase: Phase) -> anyhow::Result<()> {
        self.log.push(LifecycleEvent {
            infrastructure: self.label,
            phase,
            context_id: self.context.context_id(),
        });
        if self.fail_on == Some(phase) {
            anyhow::bail!("{} failed during {:?}", self.label, phase);
        }
        Ok(())
    }
}

#[async_trait]
impl Infrastructure<ConfigMap> for RecordingInfrastructure {
    fn name(&self) -> &'static str {
        self.label
    }

    fn order(&self) -> Option<i32> {
        self.order
    }

    fn context(&self) -> &InfrastructureContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut InfrastructureContext {
        &mut self.context
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        self.record(Phase::Initialize)?;
        self.context.mark_initialized();
        Ok(())
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        self.record(Phase::Reset)
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        self.record(Phase::Destroy)?;
        self.context.mark_destroyed();
        Ok(())
    }

    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<ConfigMap>> {
        if self.consumes { Some(self) } else { None }
    }

    fn as_producer(&self) -> Option<&dyn ConfigProducer<ConfigMap>> {
        if self.produces.is_some() { Some(self) } else { None }
    }
}

impl ConfigConsumer<ConfigMap> for RecordingInfrastructure {
    fn accept_configuration(&mut self, configuration: ConfigMap) {
        self.received = Some(configuration);
    }
}

impl ConfigProducer<ConfigMap> for RecordingInfrastructure {
    fn produced_configuration(&self) -> ConfigMap {
        self.produces.clone().unwrap_or_default()
    }
}
