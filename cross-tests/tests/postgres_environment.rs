//! Container-backed scenario. Needs a Docker daemon:
//! `cargo test -p cross-tests -- --ignored`.

use async_trait::async_trait;
use environment::{Environment, EnvironmentConfig, setup_fn};
use std::sync::{Arc, Mutex};
use tb_core::ConfigMap;
use testing::{
    AddApplication, ApplicationAccess, ConfigurableApplication, init_tracing,
    postgres_infrastructure,
};

#[derive(Clone, Default)]
struct ReportingService {
    database_url: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl ConfigurableApplication for ReportingService {
    async fn start(&mut self, configuration: ConfigMap) -> anyhow::Result<()> {
        let url = configuration
            .get("ConnectionStrings.Reports")
            .ok_or_else(|| anyhow::anyhow!("missing ConnectionStrings.Reports"))?;
        *self.database_url.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn application_receives_postgres_url() {
    init_tracing();
    let service = ReportingService::default();
    let registered = service.clone();
    let mut env: Environment<ConfigMap> = Environment::new(setup_fn(
        move |config: &mut EnvironmentConfig<ConfigMap>| {
            config
                .add_application(registered)
                .add_infrastructure(postgres_infrastructure("ConnectionStrings.Reports"));
            Ok(())
        },
    ));

    env.initialize().await.unwrap();

    let url = service.database_url.lock().unwrap().clone().unwrap();
    assert!(url.starts_with("postgres://"));
    assert!(url.ends_with(&env.id().scoped_name("db")));
    assert!(env.application::<ReportingService>().unwrap().is_started());
    env.reset().await.unwrap();

    env.destroy().await.unwrap();
}
