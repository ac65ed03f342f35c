//! Storage listing entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix that marks an object as a JSON document.
pub const JSON_SUFFIX: &str = ".json";

/// One entry returned by a storage list call.
///
/// Folders come back with `id = None`; only `name` is relied upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl ObjectEntry {
    /// Creates an entry carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            updated_at: None,
            metadata: None,
        }
    }

    /// Returns whether the entry name ends with `.json`.
    pub fn is_json(&self) -> bool {
        self.name.ends_with(JSON_SUFFIX)
    }
}
