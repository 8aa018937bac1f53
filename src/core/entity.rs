//! Entity traits defining the core abstraction for all record types

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

/// Identifier of a record as the REST backend hands it out
///
/// The placeholder backend uses numeric ids; locally created or imported
/// records may carry string ids. Both compare by value, so an `EntityId`
/// can key a [`SelectionStore`](crate::selection::SelectionStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(u64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId::Number(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

impl EntityId {
    /// Parse a command-line or path segment, preferring the numeric form
    pub fn parse(raw: &str) -> Self {
        raw.parse::<u64>()
            .map(EntityId::Number)
            .unwrap_or_else(|_| EntityId::Text(raw.to_string()))
    }

    /// Read the `id` field of a JSON record
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value.get("id")? {
            serde_json::Value::Number(n) => n.as_u64().map(EntityId::Number),
            serde_json::Value::String(s) => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }
}

/// Base trait for all records exposed by the REST backend.
///
/// Every record has an `id` and lives under a plural resource path
/// (`/users`, `/posts`, ...).
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The plural resource name used in URLs (e.g., "users", "posts")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "user", "post")
    fn resource_name_singular() -> &'static str;

    /// Get the identifier of this record
    fn id(&self) -> EntityId;

    /// Collection path, e.g. `/users`
    fn collection_path() -> String {
        format!("/{}", Self::resource_name())
    }

    /// Item path, e.g. `/users/3`
    fn item_path(id: &EntityId) -> String {
        format!("/{}/{}", Self::resource_name(), id)
    }
}
