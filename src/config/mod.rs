//! Configuration loading and management

use crate::client::RetryPolicy;
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public placeholder backend used when no base url is configured
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// Configuration for an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Singular form (e.g., "user", "todo")
    pub singular: String,

    /// Plural form, also the path segment (e.g., "users", "todos")
    pub plural: String,
}

/// Retry policies applied by resource clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryPolicy::reads")]
    pub reads: RetryPolicy,

    #[serde(default = "RetryPolicy::mutations")]
    pub mutations: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            reads: RetryPolicy::reads(),
            mutations: RetryPolicy::mutations(),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base url of the REST backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Entity types exposed by the backend
    #[serde(default)]
    pub entities: Vec<EntityConfig>,

    /// Optional path to a local JSON document used instead of the backend
    #[serde(default)]
    pub fallback_data: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.to_string(),
            },
            _ => ConfigError::from(e),
        })?;
        Self::parse(&content, Some(path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, None)
    }

    fn parse(yaml: &str, file: Option<&str>) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: file.map(str::to_string),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then check the result again
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        timeout_ms: Option<u64>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(timeout_ms) = timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                value: "0".to_string(),
                message: "timeout must be positive".to_string(),
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                message: "expected an http(s) url".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Find an entity by its plural or singular name
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities
            .iter()
            .find(|e| e.plural == name || e.singular == name)
    }

    /// Configuration for the public placeholder backend and its six entities
    pub fn default_config() -> Self {
        let entity = |singular: &str, plural: &str| EntityConfig {
            singular: singular.to_string(),
            plural: plural.to_string(),
        };

        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
            entities: vec![
                entity("user", "users"),
                entity("post", "posts"),
                entity("todo", "todos"),
                entity("comment", "comments"),
                entity("photo", "photos"),
                entity("calendar_event", "calendar"),
            ],
            fallback_data: None,
        }
    }
}
