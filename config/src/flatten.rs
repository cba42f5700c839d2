//! # Configuration Flattening
//!
//! One-way conversion of structured configuration into a `ConfigMap`, for
//! consumers that only understand string keys (an application host reading an
//! in-memory key/value source, for example).
//!
//! # Key Format
//! - Nested fields are dot-joined: `database.connection_string`
//! - Sequence items are indexed: `hosts[0]`, `hosts[1]`
//! - Scalars are rendered as strings, `null` becomes an explicit null entry
//! - Empty sequences and empty objects produce no key at all, so `hosts: []`
//!   reads the same as an absent `hosts`
//!
//! Field names are the serialized names, so `#[serde(rename)]` applies.

use errors::ConfigError;
use serde::Serialize;
use serde_json::Value;
use tb_core::ConfigMap;

/// Flatten `value` with no key prefix.
///
/// ```rust
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Database {
///     url: String,
///     replicas: Vec<String>,
/// }
///
/// let map = config::flatten(&Database {
///     url: "postgres://localhost".to_string(),
///     replicas: vec!["r1".to_string()],
/// })
/// .unwrap();
///
/// assert_eq!(map.get("url"), Some("postgres://localhost"));
/// assert_eq!(map.get("replicas[0]"), Some("r1"));
/// ```
pub fn flatten<T: Serialize + ?Sized>(value: &T) -> Result<ConfigMap, ConfigError> {
    flatten_with_prefix(value, "")
}

/// Flatten `value`, rooting every key under `prefix`.
pub fn flatten_with_prefix<T: Serialize + ?Sized>(
    value: &T,
    prefix: &str,
) -> Result<ConfigMap, ConfigError> {
    let tree = serde_json::to_value(value).map_err(|e| ConfigError::Flatten {
        reason: e.to_string(),
    })?;

    let mut map = ConfigMap::new();
    flatten_value(&mut map, &tree, prefix.to_string());
    Ok(map)
}

fn flatten_value(map: &mut ConfigMap, value: &Value, prefix: String) {
    match value {
        // unit and absent root values carry no keys
        Value::Null if prefix.is_empty() => {}
        Value::Null => map.insert_null(prefix),
        Value::Bool(b) => map.insert(prefix, b.to_string()),
        Value::Number(n) => map.insert(prefix, n.to_string()),
        Value::String(s) => map.insert(prefix, s.clone()),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(map, item, format!("{}[{}]", prefix, index));
            }
        }
        Value::Object(fields) => {
            for (name, field) in fields {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                flatten_value(map, field, key);
            }
        }
    }
}

/// `ConfigMap` view of any serializable configuration.
pub trait ToConfigMap {
    fn to_config_map(&self) -> Result<ConfigMap, ConfigError>;
}

impl<T: Serialize + ?Sized> ToConfigMap for T {
    fn to_config_map(&self) -> Result<ConfigMap, ConfigError> {
        flatten(self)
    }
}
