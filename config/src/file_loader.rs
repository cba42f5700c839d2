//! # Configuration File Loading
//!
//! Loads any deserializable configuration (settings, a typed environment
//! configuration, a `ConfigMap`) from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use errors::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;

fn read(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load configuration from a TOML file.
pub fn load_from_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = read(path)?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse {
        reason: e.to_string(),
    })
}

/// Load configuration from a YAML file.
pub fn load_from_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = read(path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::YamlParse {
        reason: e.to_string(),
    })
}

/// Load configuration from file with auto-detection.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml` / `.yml`: YAML format
///
/// ## Usage
/// ```rust,no_run
/// use config::{EnvironmentSettings, load_from_file};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let settings: EnvironmentSettings = load_from_file(Path::new("testbed.toml"))?;
///     Ok(())
/// }
/// ```
pub fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConfigError::NoExtension {
            path: path.display().to_string(),
        })?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}
