//! A database that publishes its connection string and an application that
//! is started with it, wired through a typed configuration.

use async_trait::async_trait;
use environment::{Environment, EnvironmentConfig, EnvironmentSetup, EnvironmentState};
use errors::EnvironmentError;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tb_core::{
    ConfigConsumer, ConfigMap, ConfigProducer, Configuration, Infrastructure, InfrastructureContext,
};
use testing::{
    AddApplication, ApplicationAccess, ConfigurableApplication, EnvironmentFixture,
    init_tracing,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct DatabaseSettings {
    connection_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
struct SampleConfiguration {
    database: DatabaseSettings,
    api_key: Option<String>,
}

impl Configuration for SampleConfiguration {}

/// In-memory database: one scoped database name per environment, rows
/// cleared on reset.
#[derive(Default)]
struct SampleDatabase {
    context: InfrastructureContext,
    received: SampleConfiguration,
    database_name: Option<String>,
    rows: Vec<String>,
}

impl SampleDatabase {
    fn insert(&mut self, row: &str) {
        self.rows.push(row.to_string());
    }
}

#[async_trait]
impl Infrastructure<SampleConfiguration> for SampleDatabase {
    fn order(&self) -> Option<i32> {
        Some(1)
    }

    fn context(&self) -> &InfrastructureContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut InfrastructureContext {
        &mut self.context
    }

    async fn initialize(&mut self) -> anyhow::Result<()> {
        self.database_name = Some(self.context.context_id().scoped_name("sample"));
        self.context.mark_initialized();
        Ok(())
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        self.rows.clear();
        Ok(())
    }

    async fn destroy(&mut self) -> anyhow::Result<()> {
        self.database_name = None;
        self.context.mark_destroyed();
        Ok(())
    }

    fn as_consumer(&mut self) -> Option<&mut dyn ConfigConsumer<SampleConfiguration>> {
        Some(self)
    }

    fn as_producer(&self) -> Option<&dyn ConfigProducer<SampleConfiguration>> {
        Some(self)
    }
}

impl ConfigConsumer<SampleConfiguration> for SampleDatabase {
    fn accept_configuration(&mut self, configuration: SampleConfiguration) {
        self.received = configuration;
    }
}

impl ConfigProducer<SampleConfiguration> for SampleDatabase {
    fn produced_configuration(&self) -> SampleConfiguration {
        let mut configuration = self.received.clone();
        configuration.database.connection_string = self
            .database_name
            .as_ref()
            .map(|name| format!("Host=localhost;Database={name}"));
        configuration
    }
}

#[derive(Clone, Default)]
struct SampleApp {
    started_with: Arc<Mutex<Option<ConfigMap>>>,
    resets: Arc<Mutex<u32>>,
}

#[async_trait]
impl ConfigurableApplication for SampleApp {
    async fn start(&mut self, configuration: ConfigMap) -> anyhow::Result<()> {
        *self.started_with.lock().unwrap() = Some(configuration);
        Ok(())
    }

    async fn reset(&mut self) -> anyhow::Result<()> {
        *self.resets.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct SampleEnvironment {
    app: SampleApp,
}

#[async_trait]
impl EnvironmentSetup<SampleConfiguration> for SampleEnvironment {
    async fn configure_environment(
        self: Box<Self>,
        config: &mut EnvironmentConfig<SampleConfiguration>,
    ) -> anyhow::Result<()> {
        config
            .with_configuration(SampleConfiguration {
                api_key: Some("test-key".to_string()),
                ..SampleConfiguration::default()
            })
            .add_application(self.app)
            .add_infrastructure(SampleDatabase::default());
        Ok(())
    }
}

#[tokio::test]
async fn application_starts_with_database_connection_string() {
    init_tracing();
    let app = SampleApp::default();
    let mut env: Environment<SampleConfiguration> =
        Environment::new(SampleEnvironment { app: app.clone() });

    env.initialize().await.unwrap();

    let database_name = env.id().scoped_name("sample");
    let started_with = app.started_with.lock().unwrap().clone().unwrap();
    assert_eq!(
        started_with.get("database.connection_string"),
        Some(format!("Host=localhost;Database={database_name}").as_str())
    );
    assert_eq!(started_with.get("api_key"), Some("test-key"));

    let database = env.get_infrastructure::<SampleDatabase>().unwrap();
    assert_eq!(database.context_id(), env.id());
    assert!(env.application::<SampleApp>().unwrap().is_started());

    env.destroy().await.unwrap();
    assert_eq!(env.state(), EnvironmentState::Destroyed);
}

#[tokio::test]
async fn fixture_isolates_tests_through_reset() {
    init_tracing();
    let app = SampleApp::default();
    let fixture =
        EnvironmentFixture::<SampleConfiguration>::start(SampleEnvironment { app: app.clone() })
            .await
            .unwrap();

    let failed = fixture
        .run(|env| {
            Box::pin(async move {
                env.get_infrastructure_mut::<SampleDatabase>()?.insert("order-1");
                anyhow::ensure!(
                    env.get_infrastructure::<SampleDatabase>()?.rows.len() == 2,
                    "expected 2 rows"
                );
                Ok::<_, anyhow::Error>(())
            })
        })
        .await;
    assert_eq!(failed.unwrap_err().to_string(), "expected 2 rows");

    let rows = fixture
        .run(|env| {
            Box::pin(async move {
                let database = env.get_infrastructure::<SampleDatabase>()?;
                Ok::<_, anyhow::Error>(database.rows.len())
            })
        })
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(*app.resets.lock().unwrap(), 2);

    fixture.dispose().await.unwrap();
}

#[tokio::test]
async fn environments_get_distinct_scoped_resources() {
    let mut first: Environment<SampleConfiguration> = Environment::new(SampleEnvironment {
        app: SampleApp::default(),
    });
    let mut second: Environment<SampleConfiguration> = Environment::new(SampleEnvironment {
        app: SampleApp::default(),
    });
    first.initialize().await.unwrap();
    second.initialize().await.unwrap();

    let first_db = first.configuration().database.connection_string.clone();
    let second_db = second.configuration().database.connection_string.clone();
    assert!(first_db.is_some());
    assert_ne!(first_db, second_db);

    first.destroy().await.unwrap();
    second.destroy().await.unwrap();
}

/// Never registered by `SampleEnvironment`.
struct AuditApp;

#[async_trait]
impl ConfigurableApplication for AuditApp {
    async fn start(&mut self, _configuration: ConfigMap) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn missing_infrastructure_surfaces_as_environment_error() {
    let fixture = EnvironmentFixture::<SampleConfiguration>::start(SampleEnvironment {
        app: SampleApp::default(),
    })
    .await
    .unwrap();

    let err = fixture
        .run(|env| {
            Box::pin(async move {
                env.application::<AuditApp>()?;
                Ok::<_, anyhow::Error>(())
            })
        })
        .await
        .unwrap_err();

    match err.downcast_ref::<EnvironmentError>() {
        Some(EnvironmentError::InfrastructureNotFound { type_name, hook }) => {
            assert!(type_name.contains("AuditApp"));
            assert_eq!(*hook, "EnvironmentSetup::configure_environment");
        }
        other => panic!("expected InfrastructureNotFound, got {other:?}"),
    }

    fixture.dispose().await.unwrap();
}
