//! Test-runner adapters and ready-made infrastructures.
//!
//! - [`EnvironmentFixture`]: one environment per test group, reset after
//!   every test, destroyed once
//! - [`SharedFixture`]: one lazily started fixture per test process
//! - [`BlockingFixture`]: the same for plain `#[test]` functions
//! - [`ApplicationInfrastructure`]: the application under test, after every
//!   ordered infrastructure
//! - [`ContainerInfrastructure`]: a testcontainers-backed infrastructure
//! - [`PostgresInfrastructure`]: one PostgreSQL database per environment,
//!   truncated on reset
//! - [`RecordingInfrastructure`]: a double that records its lifecycle calls

mod application;
mod container;
mod doubles;
mod fixtures;
mod postgres;

pub use application::{
    APPLICATION_NAME, APPLICATION_ORDER, AddApplication, ApplicationAccess, ApplicationInfrastructure,
    ConfigurableApplication,
};
pub use container::{ContainerEndpoints, ContainerInfrastructure};
pub use postgres::{
    POSTGRES_PASSWORD, POSTGRES_PORT, POSTGRES_USER, PostgresInfrastructure,
    postgres_infrastructure,
};
pub use doubles::{EventLog, LifecycleEvent, Phase, RecordingInfrastructure};
pub use fixtures::{BlockingFixture, EnvironmentFixture, SharedFixture};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Routes `tracing` output of the engine to the test harness.
///
/// Filter comes from `RUST_LOG` (default `warn`). Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}
