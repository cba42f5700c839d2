//! # Configuration Precedence
//!
//! Merges named `ConfigMap` sources in order, later sources winning per key.

use tb_core::ConfigMap;

/// Layer `sources` from lowest to highest precedence.
///
/// ## Usage
/// ```rust
/// use config::layer_maps;
/// use tb_core::ConfigMap;
///
/// let defaults: ConfigMap = [("Mode", "slow"), ("Region", "eu")].into_iter().collect();
/// let overrides: ConfigMap = [("Mode", "fast")].into_iter().collect();
///
/// let merged = layer_maps([("defaults", defaults), ("env", overrides)]);
/// assert_eq!(merged.get("Mode"), Some("fast"));
/// assert_eq!(merged.get("Region"), Some("eu"));
/// ```
///
/// Every overridden key is logged at debug level with the source that won.
pub fn layer_maps<'a>(sources: impl IntoIterator<Item = (&'a str, ConfigMap)>) -> ConfigMap {
    let mut merged = ConfigMap::new();
    for (source_name, source) in sources {
        let overridden = merged.overlay(source);
        for key in &overridden {
            tracing::debug!(key = %key, source = source_name, "configuration value overridden");
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_sources_win() {
        let merged = layer_maps([
            ("defaults", [("a", "1"), ("b", "1")].into_iter().collect()),
            ("file", [("b", "2")].into_iter().collect()),
            ("env", [("b", "3"), ("c", "3")].into_iter().collect()),
        ]);

        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("3"));
        assert_eq!(merged.get("c"), Some("3"));
    }

    #[test]
    fn test_null_from_later_source_overrides_value() {
        let mut nulls = ConfigMap::new();
        nulls.insert_null("a");

        let merged = layer_maps([("defaults", [("a", "1")].into_iter().collect()), ("env", nulls)]);
        assert!(merged.is_null("a"));
    }

    #[test]
    fn test_no_sources_yields_empty_map() {
        assert!(layer_maps(Vec::<(&str, ConfigMap)>::new()).is_empty());
    }
}
