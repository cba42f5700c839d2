//! # Testbed Errors
//!
//! Domain errors for the environment lifecycle engine.
//!
//! Only failures raised by the engine itself live here. Errors coming out of
//! an infrastructure's own `initialize`/`reset`/`destroy` are propagated by the
//! environment untouched, so callers can downcast them to the collaborator's
//! concrete type.

use thiserror::Error;

/// Errors raised by an environment while sequencing its infrastructures.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// No registered infrastructure has the requested type.
    #[error(
        "Infrastructure of type {type_name} is not registered in this environment, check {hook}"
    )]
    InfrastructureNotFound {
        type_name: &'static str,
        hook: &'static str,
    },

    /// More than one registered infrastructure has the requested type.
    #[error(
        "Infrastructure of type {type_name} is registered {count} times, use infrastructures_of to select one"
    )]
    AmbiguousInfrastructure { type_name: &'static str, count: usize },

    /// A lifecycle operation was requested in a state that does not allow it.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

/// Configuration flattening, loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to flatten configuration: {reason}")]
    Flatten { reason: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {reason}")]
    TomlParse { reason: String },

    #[error("Failed to parse YAML: {reason}")]
    YamlParse { reason: String },

    #[error("Config file {path} has no extension")]
    NoExtension { path: String },

    #[error("Unsupported config file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidEnvValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid settings: {reason}")]
    Validation { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_type_and_hook() {
        let err = EnvironmentError::InfrastructureNotFound {
            type_name: "my_crate::DatabaseInfrastructure",
            hook: "EnvironmentSetup::configure_environment",
        };
        let message = err.to_string();
        assert!(message.contains("my_crate::DatabaseInfrastructure"));
        assert!(message.contains("configure_environment"));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = EnvironmentError::InvalidState {
            operation: "reset",
            state: "destroyed".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot reset while destroyed");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConfigError = io.into();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
