//! # Test Environments
//!
//! An environment owns a set of infrastructures and drives them through
//! initialize, any number of resets, and destroy, always visiting them in
//! ascending `order` (unordered last, ties by registration).
//!
//! During initialize, configuration accumulated from earlier producers is
//! handed to each consumer before its `initialize`, and each producer's output
//! is merged back right after.
//!
//! ```rust,no_run
//! use environment::{Environment, EnvironmentConfig, setup_fn};
//! use tb_core::ConfigMap;
//!
//! # async fn run(database: impl tb_core::Infrastructure<ConfigMap>) -> anyhow::Result<()> {
//! let mut env = Environment::<ConfigMap>::new(setup_fn(
//!     move |config: &mut EnvironmentConfig<ConfigMap>| {
//!         config.add_infrastructure(database);
//!         Ok(())
//!     },
//! ));
//!
//! env.initialize().await?;
//! env.reset().await?;
//! env.destroy().await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod environment;
pub mod scoped;
pub mod setup;

pub use blocking::BlockingEnvironment;
pub use environment::{Environment, EnvironmentId, EnvironmentState};
pub use scoped::{Standalone, with_infrastructure};
pub use setup::{EnvironmentConfig, EnvironmentSetup, SetupFn, setup_fn};
