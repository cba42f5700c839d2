//! # Environment Variable Loader
//!
//! Loads settings and seed configuration from environment variables.
//!
//! # Naming Convention
//! - `TESTBED_*`: lifecycle engine settings
//! - `<PREFIX>_*`: seed configuration for an environment, where the caller
//!   picks the prefix and `__` separates nested keys

use crate::file_loader::load_from_file;
use crate::settings::{EnvironmentSettings, TeardownOrder};
use errors::ConfigError;
use std::env;
use std::path::Path;
use tb_core::ConfigMap;

pub const TEARDOWN_ORDER_VAR: &str = "TESTBED_TEARDOWN_ORDER";
pub const DESTROY_ON_FAILED_INITIALIZE_VAR: &str = "TESTBED_DESTROY_ON_FAILED_INITIALIZE";
pub const BLOCKING_WORKER_THREADS_VAR: &str = "TESTBED_BLOCKING_WORKER_THREADS";

/// Load settings from environment variables over the defaults.
///
/// ## Environment Variables
/// - `TESTBED_TEARDOWN_ORDER`: `setup` or `reverse` (default: setup)
/// - `TESTBED_DESTROY_ON_FAILED_INITIALIZE`: true/false (default: false)
/// - `TESTBED_BLOCKING_WORKER_THREADS`: 1-64 (default: 1)
pub fn load_settings_from_env() -> Result<EnvironmentSettings, ConfigError> {
    let mut settings = EnvironmentSettings::default();
    apply_env_overrides(&mut settings)?;
    settings.validated()
}

/// Overwrite the fields whose variable is set. Unset variables leave the
/// field untouched.
pub fn apply_env_overrides(settings: &mut EnvironmentSettings) -> Result<(), ConfigError> {
    if let Some(order) = parse_env::<TeardownOrder>(TEARDOWN_ORDER_VAR)? {
        settings.teardown_order = order;
    }
    if let Some(enabled) = parse_env::<bool>(DESTROY_ON_FAILED_INITIALIZE_VAR)? {
        settings.destroy_on_failed_initialize = enabled;
    }
    if let Some(threads) = parse_env::<usize>(BLOCKING_WORKER_THREADS_VAR)? {
        settings.blocking_worker_threads = threads;
    }
    Ok(())
}

/// Load settings with precedence: environment variables > file > defaults.
pub fn load_settings(path: Option<&Path>) -> Result<EnvironmentSettings, ConfigError> {
    let mut settings = match path {
        Some(path) => load_from_file(path)?,
        None => EnvironmentSettings::default(),
    };
    apply_env_overrides(&mut settings)?;
    settings.validated()
}

/// Collect every variable starting with `prefix` into a `ConfigMap`.
///
/// The prefix is stripped and `__` becomes `.`, so with prefix `APP_` the
/// variable `APP_Database__Url` lands under key `Database.Url`. Keys keep
/// their case. Variables whose name or value is not valid unicode are skipped.
pub fn load_map_from_env(prefix: &str) -> ConfigMap {
    let mut map = ConfigMap::new();
    for (name, value) in env::vars_os() {
        let (Ok(name), Ok(value)) = (name.into_string(), value.into_string()) else {
            continue;
        };
        if let Some(key) = name.strip_prefix(prefix) {
            if !key.is_empty() {
                map.insert(key.replace("__", "."), value);
            }
        }
    }
    map
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
