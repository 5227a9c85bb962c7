use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::loader::depend::{BatchLoad, LoaderKey};

/// Config values for loader types, keyed by the loader's fully qualified name.
///
/// ```rust
/// use resolvent::prelude::*;
/// # #[derive(Default)]
/// # struct BookLoader;
/// # #[async_trait::async_trait]
/// # impl BatchLoad for BookLoader {
/// #     type Key = u32;
/// #     type Value = String;
/// #     async fn batch_load(&self, keys: &[u32]) -> Result<Vec<String>, ResolveError> {
/// #         Ok(keys.iter().map(|k| k.to_string()).collect())
/// #     }
/// # }
/// let config = LoaderConfig::new().set::<BookLoader>("status", "published");
/// assert_eq!(config.len(), 1);
/// ```
///
/// It also deserializes from a JSON object of the form
/// `{ "<module path>::<LoaderName>": { "<field>": <value> } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoaderConfig {
    entries: HashMap<String, HashMap<String, Value>>,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one config field for the loader type `L`.
    pub fn set<L: BatchLoad>(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(LoaderKey::of::<L>(), field, value);
        self
    }

    /// Sets one config field for the loader identified by `key`.
    pub fn insert(&mut self, key: LoaderKey, field: &str, value: impl Into<Value>) {
        self.entries
            .entry(key.name().to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    pub fn values_for(&self, key: LoaderKey) -> Option<&HashMap<String, Value>> {
        self.entries.get(key.name())
    }

    /// Names of every loader that has config.
    pub fn loader_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
