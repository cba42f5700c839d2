//! # Configuration System
//!
//! Configuration helpers for test environments.
//!
//! This crate provides:
//! - Flattening of any `Serialize` value into a string-keyed `ConfigMap`
//! - Layering of named configuration sources (last write wins, logged)
//! - Configuration file loading (TOML/YAML)
//! - Environment variable loading (`PREFIX_SECTION__KEY` -> `SECTION.KEY`)
//! - `EnvironmentSettings`, the knobs of the lifecycle engine itself

pub mod file_loader;
pub mod flatten;
pub mod loader;
pub mod precedence;
pub mod settings;

pub use errors::ConfigError;
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml};
pub use flatten::{ToConfigMap, flatten, flatten_with_prefix};
pub use loader::{apply_env_overrides, load_map_from_env, load_settings, load_settings_from_env};
pub use precedence::layer_maps;
pub use settings::{EnvironmentSettings, TeardownOrder};
pub use validator::Validate;
