//! Fixtures binding an environment's lifecycle to a test runner's.
//!
//! A fixture initializes its environment once, resets it after every test
//! that runs through it, and destroys it once at the end.

use config::EnvironmentSettings;
use environment::{BlockingEnvironment, Environment, EnvironmentId, EnvironmentSetup};
use futures_util::future::BoxFuture;
use std::sync::{Mutex, PoisonError};
use tb_core::Configuration;
use tokio::sync::{MutexGuard, OnceCell};
use tracing::{debug, warn};

/// Async fixture over one [`Environment`].
///
/// Tests run one at a time through [`run`](Self::run); the environment is
/// reset after each of them, whatever the outcome.
pub struct EnvironmentFixture<C: Configuration = ()> {
    id: EnvironmentId,
    environment: tokio::sync::Mutex<Environment<C>>,
}

impl<C: Configuration> EnvironmentFixture<C> {
    /// Builds and initializes the environment.
    pub async fn start(setup: impl EnvironmentSetup<C> + 'static) -> anyhow::Result<Self> {
        Self::start_with_settings(setup, EnvironmentSettings::default()).await
    }

    pub async fn start_with_settings(
        setup: impl EnvironmentSetup<C> + 'static,
        settings: EnvironmentSettings,
    ) -> anyhow::Result<Self> {
        let mut environment = Environment::with_settings(setup, settings);
        environment.initialize().await?;
        Ok(Self {
            id: environment.id(),
            environment: tokio::sync::Mutex::new(environment),
        })
    }

    pub fn id(&self) -> EnvironmentId {
        self.id
    }

    /// Runs `test` against the environment, then resets it.
    ///
    /// The test's error is returned in preference to a reset error.
    pub async fn run<T, F>(&self, test: F) -> anyhow::Result<T>
    where
        F: for<'a> FnOnce(&'a mut Environment<C>) -> BoxFuture<'a, anyhow::Result<T>>,
    {
        let mut environment = self.environment.lock().await;
        let outcome = test(&mut *environment).await;
        let reset = environment.reset().await;

        match (outcome, reset) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(reset_err)) => {
                warn!(environment_id = %self.id, error = %reset_err, "reset after failed test failed");
                Err(e)
            }
        }
    }

    /// Direct access for setup steps that are not tests. No reset follows.
    pub async fn lock(&self) -> MutexGuard<'_, Environment<C>> {
        self.environment.lock().await
    }

    /// Destroys the environment. Safe to call more than once.
    pub async fn dispose(&self) -> anyhow::Result<()> {
        debug!(environment_id = %self.id, "disposing environment fixture");
        self.environment.lock().await.destroy().await
    }
}

/// A process-wide [`EnvironmentFixture`], started by the first test that
/// asks for it.
///
/// ```rust,no_run
/// use environment::{EnvironmentConfig, setup_fn};
/// use testing::SharedFixture;
///
/// static DATABASE: SharedFixture = SharedFixture::new();
///
/// # async fn test() -> anyhow::Result<()> {
/// let fixture = DATABASE
///     .get_or_start(|| setup_fn(|_config: &mut EnvironmentConfig| Ok(())))
///     .await?;
/// fixture.run(|_env| Box::pin(async move { Ok(()) })).await?;
/// # Ok(())
/// # }
/// ```
///
/// Every `#[tokio::test]` owns its runtime. The fixture itself can be driven
/// from any of them, but infrastructures held here must not depend on the
/// runtime of the test that started them: a connection pool or a spawned
/// task dies with that runtime.
pub struct SharedFixture<C: Configuration = ()> {
    cell: OnceCell<EnvironmentFixture<C>>,
}

impl<C: Configuration> SharedFixture<C> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// The started fixture, starting it with `setup()` on first use.
    ///
    /// A failed start is not cached; the next caller tries again.
    pub async fn get_or_start<F, S>(&self, setup: F) -> anyhow::Result<&EnvironmentFixture<C>>
    where
        F: FnOnce() -> S,
        S: EnvironmentSetup<C> + 'static,
    {
        self.cell
            .get_or_try_init(|| async move { EnvironmentFixture::start(setup()).await })
            .await
    }

    pub fn get(&self) -> Option<&EnvironmentFixture<C>> {
        self.cell.get()
    }

    /// Destroys the environment if it was ever started.
    pub async fn dispose(&self) -> anyhow::Result<()> {
        match self.cell.get() {
            Some(fixture) => fixture.dispose().await,
            None => Ok(()),
        }
    }
}

impl<C: Configuration> Default for SharedFixture<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// [`EnvironmentFixture`] for plain `#[test]` functions.
///
/// Dropping the fixture destroys the environment.
pub struct BlockingFixture<C: Configuration = ()> {
    environment: Mutex<BlockingEnvironment<C>>,
}

impl<C: Configuration> BlockingFixture<C> {
    pub fn start(setup: impl EnvironmentSetup<C> + 'static) -> anyhow::Result<Self> {
        Self::start_with_settings(setup, EnvironmentSettings::default())
    }

    pub fn start_with_settings(
        setup: impl EnvironmentSetup<C> + 'static,
        settings: EnvironmentSettings,
    ) -> anyhow::Result<Self> {
        let mut environment = BlockingEnvironment::with_settings(setup, settings)?;
        environment.initialize()?;
        Ok(Self {
            environment: Mutex::new(environment),
        })
    }

    /// Runs `test`, then resets. The test's error wins over a reset error.
    pub fn run<T>(
        &self,
        test: impl FnOnce(&mut BlockingEnvironment<C>) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut environment = self
            .environment
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let outcome = test(&mut *environment);
        let reset = environment.reset();

        match (outcome, reset) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(reset_err)) => {
                warn!(
                    environment_id = %environment.id(),
                    error = %reset_err,
                    "reset after failed test failed"
                );
                Err(e)
            }
        }
    }

    /// Destroys the environment now instead of on drop.
    pub fn dispose(&self) -> anyhow::Result<()> {
        self.environment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .destroy()
    }
}
