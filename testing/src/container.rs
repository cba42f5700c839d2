//! Infrastructures backed by a testcontainers container.
//!
//! The container is started on initialize and removed on destroy. Reset is a
//! no-op; isolate tests through [`ContextId::scoped_name`] instead, or wrap
//! the container the way [`PostgresInfrastructure`](crate::PostgresInfrastructure)
//! does to clear its data.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tb_core::{
    ConfigMap, ConfigProducer, Configuration, ContextId, Infrastructure, InfrastructureContext,
};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, Image};
use tracing::{debug, info};

/// Where a started container can be reached from the test process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEndpoints {
    context_id: ContextId,
    host: String,
    ports: BTreeMap<u16, u16>,
}

impl ContainerEndpoints {
    pub fn new(context_id: ContextId, host: impl Into<String>, ports: BTreeMap<u16, u16>) -> Self {
        Self {
            context_id,
            host: host.into(),
            ports,
        }
    }

    /// Context the container was started for.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host port mapped to `internal` container port.
    pub fn port(&self, internal: u16) -> Option<u16> {
        self.ports.get(&internal).copied()
    }

    /// `host:port` for `internal`, if that port was exposed.
    pub fn address(&self, internal: u16) -> Option<String> {
        self.port(internal).map(|port| format!("{}:{}", self.host, port))
    }
}

type RequestFactory<I> = Box<dyn Fn(ContextId) -> ContainerRequest<I> + Send + Sync>;
type Publisher<C> = Box<dyn Fn(&ContainerEndpoints) -> C + Send + Sync>;

/// One container per environment.
///
/// The request is built at initialize from the infrastructure's context id,
/// so resources inside the container can be named per environment.
pub struct ContainerInfrastructure<I: Image, C: Configuration = ConfigMap> {
    name: &'static str,
    order: Option<i32>,
    context: InfrastructureContext,
    request: RequestFactory<I>,
    exposed_ports: Vec<u16>,
    publish: Option<Publisher<C>>,
    container: Option<ContainerAsync<I>>,
    endpoints: Option<ContainerEndpoints>,
}

impl<I: Image + 'static, C: Configuration> ContainerInfrastructure<I, C> {
    pub fn new<F, R>(name: &'static str, request: F) -> Self
    where
        F: Fn(ContextId) -> R + Send + Sync + 'static,
        R: Into<ContainerRequest<I>>,
    {
        Self {
            name,
            order: None,
            context: InfrastructureContext::new().with_auto_reset(false),
            request: Box::new(move |context_id| request(context_id).into()),
            exposed_ports: Vec::new(),
            publish: None,
            container: None,
            endpoints: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Containers are not reset by default.
    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.context.set_auto_reset(auto_reset);
        self
    }

    /// Container ports whose host mapping is recorded after start.
    pub fn with_exposed_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.exposed_ports.extend(ports);
        self
    }

    /// Turns the endpoints into configuration for later infrastructures.
    pub fn publishing<F>(mut self, publish: F) -> Self
    where
        F: Fn(&ContainerEndpoints) -> C + Send + Sync + 'static,
    {
        self.publish = Some(Box::new(publish));
        self
    }

    pub fn endpoints(&self) -> Option<&ContainerEndpoints> {
        self.endpoints.as_ref()
    }

    pub fn container(&self) -> Option<&ContainerAsync<I>> {
        self.container.as_ref()
    }
}

#[async_trait]
impl<I: Image + 'static, C: Configuration> Infrastructure<C> for ContainerInfrastructure<I, C> {
    fn name(&self) -> &'static str {
        self.name
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
        if self.container.is_some() {
            return Ok(());
        }

        let context_id = self.context.context_id();
        let request = (self.request)(context_id);
        let container = request.start().await?;

        let host = container.get_host().await?.to_string();
        let mut ports = BTreeMap::new();
        for &internal in &self.exposed_ports {
            let mapped = container.get_host_port_ipv4(internal).await?;
            ports.insert(internal, mapped);
        }

        info!(
            infrastructure = self.name,
            container_id = container.id(),
            host = %host,
            ports = ?ports,
            "container started"
        );
        self.endpoints = Some(ContainerEndpoints::new(context_id, host, ports));
        self.container = Some(container);
        self.context.mark_initialized();
        Ok(())
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        self.endpoints = None;
        self.context.mark_destroyed();
        if let Some(container) = self.container.take() {
            container.stop().await?;
            container.rm().await?;
            debug!(infrastructure = self.name, "container removed");
        }
        Ok(())
    }

    fn as_producer(&self) -> Option<&dyn ConfigProducer<C>> {
        if self.publish.is_some() { Some(self) } else { None }
    }
}

impl<I: Image + 'static, C: Configuration> ConfigProducer<C> for ContainerInfrastructure<I, C> {
    fn produced_configuration(&self) -> C {
        match (&self.publish, &self.endpoints) {
            (Some(publish), Some(endpoints)) => publish(endpoints),
            _ => C::default(),
        }
    }
}
