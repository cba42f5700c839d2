//! # Environment Settings
//!
//! Knobs of the lifecycle engine itself, as opposed to the configuration that
//! flows between infrastructures.

use errors::ConfigError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Order in which an environment destroys its infrastructures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownOrder {
    /// Same order as initialization.
    #[default]
    Setup,
    /// Reverse of initialization, dependents before their dependencies.
    Reverse,
}

impl std::str::FromStr for TeardownOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "setup" => Ok(Self::Setup),
            "reverse" => Ok(Self::Reverse),
            other => Err(format!("expected setup or reverse, got {}", other)),
        }
    }
}

/// Lifecycle engine settings.
///
/// ## Fields
/// - `teardown_order`: `setup` (default) or `reverse`
/// - `destroy_on_failed_initialize`: destroy what was already initialized
///   when a later infrastructure fails to initialize (default: false)
/// - `blocking_worker_threads`: runtime threads behind the blocking
///   environment, 1-64 (default: 1, a current-thread runtime)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EnvironmentSettings {
    pub teardown_order: TeardownOrder,

    pub destroy_on_failed_initialize: bool,

    #[validate(range(min = 1, max = 64))]
    pub blocking_worker_threads: usize,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            teardown_order: TeardownOrder::Setup,
            destroy_on_failed_initialize: false,
            blocking_worker_threads: 1,
        }
    }
}

impl EnvironmentSettings {
    pub fn with_teardown_order(mut self, teardown_order: TeardownOrder) -> Self {
        self.teardown_order = teardown_order;
        self
    }

    pub fn with_destroy_on_failed_initialize(mut self, enabled: bool) -> Self {
        self.destroy_on_failed_initialize = enabled;
        self
    }

    pub fn with_blocking_worker_threads(mut self, threads: usize) -> Self {
        self.blocking_worker_threads = threads;
        self
    }

    /// Runs the field validators, mapping failures to `ConfigError`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate().map_err(|e| ConfigError::Validation {
            reason: e.to_string(),
        })?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = EnvironmentSettings::default();
        assert_eq!(settings.teardown_order, TeardownOrder::Setup);
        assert!(!settings.destroy_on_failed_initialize);
        assert!(settings.validated().is_ok());
    }

    #[test]
    fn test_zero_worker_threads_is_rejected() {
        let result = EnvironmentSettings::default()
            .with_blocking_worker_threads(0)
            .validated();
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_teardown_order_parsing() {
        assert_eq!("Reverse".parse::<TeardownOrder>(), Ok(TeardownOrder::Reverse));
        assert_eq!(" setup ".parse::<TeardownOrder>(), Ok(TeardownOrder::Setup));
        assert!("backwards".parse::<TeardownOrder>().is_err());
    }
}
