//! Identity and configuration value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifier correlating an infrastructure with the environment that owns it.
///
/// A standalone infrastructure generates its own; once registered in an
/// environment it carries the environment's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Name for a resource scoped to this context, e.g. a per-environment
    /// database: `scoped_name("orders")` -> `orders_3f2a...`.
    pub fn scoped_name(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.0.simple())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ContextId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Environment-wide configuration shared between infrastructures.
///
/// `merge_from` is how the environment absorbs what a producer exposes after
/// its initialization. The default replaces the accumulated value wholesale,
/// which is the right behavior for strongly-typed configuration structs.
pub trait Configuration: Clone + Default + Send + Sync + 'static {
    fn merge_from(&mut self, produced: Self) {
        *self = produced;
    }
}

impl Configuration for () {
    fn merge_from(&mut self, _produced: Self) {}
}

/// Free-form string-keyed configuration.
///
/// Keys are unique and case-sensitive. A key may hold an explicit null, which
/// is distinct from the key being absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, Option<String>>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    pub fn insert_null(&mut self, key: impl Into<String>) {
        self.0.insert(key.into(), None);
    }

    /// Value for `key`, or `None` when the key is absent or null.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(None))
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Writes every entry of `other` over `self`, returning the keys whose
    /// previous value was replaced by a different one.
    pub fn overlay(&mut self, other: ConfigMap) -> Vec<String> {
        let mut overridden = Vec::new();
        for (key, value) in other.0 {
            match self.0.insert(key.clone(), value) {
                Some(previous) if Some(&previous) != self.0.get(&key) => overridden.push(key),
                _ => {}
            }
        }
        overridden
    }
}

impl Configuration for ConfigMap {
    /// Key-wise union, last write per key wins.
    fn merge_from(&mut self, produced: Self) {
        self.0.extend(produced.0);
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

impl IntoIterator for ConfigMap {
    type Item = (String, Option<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
