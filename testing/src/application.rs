//! The application under test as the last infrastructure of an environment.
//!
//! The application sees the environment's configuration as flat string keys,
//! the way an application host reads an in-memory key/value source.

use async_trait::async_trait;
use environment::{Environment, EnvironmentConfig};
use errors::EnvironmentError;
use serde::Serialize;
use tb_core::{ConfigConsumer, ConfigMap, Configuration, Infrastructure, InfrastructureContext};
use tracing::debug;

/// Order of [`ApplicationInfrastructure`]: after every infrastructure ordered
/// at or below `999`.
///
/// Unordered infrastructures still run after the application, so a producer
/// whose configuration the application needs must declare an order.
pub const APPLICATION_ORDER: i32 = 999;

/// Default log name of an [`ApplicationInfrastructure`].
pub const APPLICATION_NAME: &str = "application";

/// An application that can be hosted in-process for tests.
#[async_trait]
pub trait ConfigurableApplication: Send + Sync + 'static {
    /// Boot the application with the flattened environment configuration.
    async fn start(&mut self, configuration: ConfigMap) -> anyhow::Result<()>;

    async fn reset(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()>;
}

/// Consumer infrastructure that starts an application with whatever the
/// earlier infrastructures produced.
pub struct ApplicationInfrastructure<A, C = ConfigMap> {
    name: &'static str,
    application: A,
    context: InfrastructureContext,
    injected: Option<C>,
    started_with: Option<ConfigMap>,
}

impl<A: ConfigurableApplication, C: Configuration + Serialize> ApplicationInfrastructure<A, C> {
    pub fn new(application: A) -> Self {
        Self {
            name: APPLICATION_NAME,
            application,
            context: InfrastructureContext::new(),
            injected: None,
            started_with: None,
        }
    }

    /// Name reported in logs and in the environment's sequence.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn application(&self) -> &A {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut A {
        &mut self.application
    }

    /// The flattened configuration the application was started with.
    pub fn configuration(&self) -> Option<&ConfigMap> {
        self.started_with.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.started_with.is_some()
    }
}

#[async_trait]
impl<A, C> Infrastructure<C> for ApplicationInfrastructure<A, C>
where
    A: ConfigurableApplication,
    C: Configuration + Serialize,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn order(&self) -> Option<i32> {
        Some(APPLICATION_ORDER)
    }

    fn context(&self) -> &InfrastructureContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut InfrastructureContext {
        &mut self.context
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        let configuration = match self.injected.take() {
            Some(injected) => config::flatten(&injected)?,
            None => ConfigMap::new(),
        };
        debug!(
            infrastructure = self.name,
            application = std::any::type_name::<A>(),
            keys = configuration.len(),
            "starting application"
        );
        self.application.start(configuration.clone()).await?;
        self.started_with = Some(configuration);
        self.context.mark_initialized();
        Ok(())
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        if self.is_started() {
            self.application.reset().await?;
        }
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        if self.started_with.is_some() {
            self.application.stop().await?;
            self.started_with = None;
        }
        self.context.mark_destroyed();
        Ok(())
    }

    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<C>> {
        Some(self)
    }
}

impl<A, C> ConfigConsumer<C> for ApplicationInfrastructure<A, C>
where
    A: ConfigurableApplication,
    C: Configuration + Serialize,
{
    fn accept_configuration(&mut self, configuration: C) {
        self.injected = Some(configuration);
    }
}

/// Registers an application on an [`EnvironmentConfig`].
///
/// The application is started at [`APPLICATION_ORDER`]; it only sees the
/// configuration of producers ordered before it.
pub trait AddApplication {
    fn add_application<A: ConfigurableApplication>(&mut self, application: A) -> &mut Self;
}

impl<C: Configuration + Serialize> AddApplication for EnvironmentConfig<C> {
    fn add_application<A: ConfigurableApplication>(&mut self, application: A) -> &mut Self {
        self.add_infrastructure(ApplicationInfrastructure::<A, C>::new(application))
    }
}

/// Looks up a registered application on an [`Environment`].
pub trait ApplicationAccess<C: Configuration> {
    fn application<A: ConfigurableApplication>(
        &self,
    ) -> Result<&ApplicationInfrastructure<A, C>, EnvironmentError>;
}

impl<C: Configuration + Serialize> ApplicationAccess<C> for Environment<C> {
    fn application<A: ConfigurableApplication>(
        &self,
    ) -> Result<&ApplicationInfrastructure<A, C>, EnvironmentError> {
        self.get_infrastructure::<ApplicationInfrastructure<A, C>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doubles::{EventLog, RecordingInfrastructure};
    use environment::setup_fn;
    use serde::Deserialize;

    #[derive(Default)]
    struct WebApp {
        starts: u32,
        resets: u32,
        stops: u32,
        seen: ConfigMap,
    }

    #[async_trait]
    impl ConfigurableApplication for WebApp {
        async fn start(&mut self, configuration: ConfigMap) -> anyhow::Result<()> {
            self.starts += 1;
            self.seen = configuration;
            Ok(())
        }

        async fn reset(&mut self) -> anyhow::Result<()> {
            self.resets += 1;
            Ok(())
        }

        async fn stop(&mut self) -> anyhow::Result<()> {
            self.stops += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_application_runs_last_with_produced_configuration() {
        let log = EventLog::new();
        let database = RecordingInfrastructure::new("db", &log).with_order(1).producing(
            [("ConnectionStrings.Db", "Host=db;Port=5432")]
                .into_iter()
                .collect(),
        );

        let mut env: Environment<ConfigMap> = Environment::new(setup_fn(
            move |config: &mut EnvironmentConfig<ConfigMap>| {
                config.add_application(WebApp::default()).add_infrastructure(database);
                Ok(())
            },
        ));
        env.initialize().await.unwrap();
        assert_eq!(env.sequence(), vec!["db", APPLICATION_NAME]);

        let app = env.application::<WebApp>().unwrap();
        assert_eq!(
            app.application().seen.get("ConnectionStrings.Db"),
            Some("Host=db;Port=5432")
        );
        assert_eq!(app.configuration(), Some(&app.application().seen));

        env.reset().await.unwrap();
        env.destroy().await.unwrap();
        assert_eq!(log.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_unordered_producer_runs_after_application() {
        let log = EventLog::new();
        let cache = RecordingInfrastructure::new("cache", &log)
            .producing([("Cache.Url", "redis://cache")].into_iter().collect());

        let mut env: Environment<ConfigMap> = Environment::new(setup_fn(
            move |config: &mut EnvironmentConfig<ConfigMap>| {
                config.add_infrastructure(cache).add_application(WebApp::default());
                Ok(())
            },
        ));
        env.initialize().await.unwrap();

        assert_eq!(env.sequence(), vec![APPLICATION_NAME, "cache"]);
        let app = env.application::<WebApp>().unwrap();
        assert!(app.is_started());
        assert_eq!(app.application().seen.get("Cache.Url"), None);
        assert_eq!(env.configuration().get("Cache.Url"), Some("redis://cache"));

        env.destroy().await.unwrap();
    }

    #[test]
    fn test_name_defaults_and_overrides() {
        let infra = ApplicationInfrastructure::<WebApp>::new(WebApp::default());
        assert_eq!(Infrastructure::<ConfigMap>::name(&infra), APPLICATION_NAME);

        let infra = infra.with_name("web");
        assert_eq!(Infrastructure::<ConfigMap>::name(&infra), "web");
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Settings {
        database: Option<String>,
        features: Vec<String>,
    }

    impl Configuration for Settings {}

    #[tokio::test]
    async fn test_typed_configuration_is_flattened() {
        let mut infra = ApplicationInfrastructure::<WebApp, Settings>::new(WebApp::default());
        infra.accept_configuration(Settings {
            database: Some("postgres://db".to_string()),
            features: vec!["search".to_string()],
        });

        infra.initialize().await.unwrap();

        let seen = &infra.application().seen;
        assert_eq!(seen.get("database"), Some("postgres://db"));
        assert_eq!(seen.get("features[0]"), Some("search"));
    }

    #[tokio::test]
    async fn test_stop_only_after_start() {
        let mut infra = ApplicationInfrastructure::<WebApp>::new(WebApp::default());
        infra.destroy().await.unwrap();
        assert_eq!(infra.application().stops, 0);

        let mut infra = ApplicationInfrastructure::<WebApp>::new(WebApp::default());
        infra.initialize().await.unwrap();
        infra.reset().await.unwrap();
        infra.destroy().await.unwrap();
        infra.destroy().await.unwrap();

        let app = infra.application();
        assert_eq!((app.starts, app.resets, app.stops), (1, 1, 1));
    }

    #[test]
    fn test_application_order_constant() {
        let infra = ApplicationInfrastructure::<WebApp, ()>::new(WebApp::default());
        assert_eq!(Infrastructure::<()>::order(&infra), Some(APPLICATION_ORDER));
    }
}
