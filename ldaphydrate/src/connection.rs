use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root context attribute holding the default naming context.
pub const DEFAULT_NAMING_CONTEXT: &str = "defaultNamingContext";
/// Root context attribute holding the configuration naming context.
pub const CONFIGURATION_NAMING_CONTEXT: &str = "configurationNamingContext";

/// What hydration needs to know about the connection an operation will run on.
///
/// Absent for pure in-memory use; hydration then skips wire encoding and connection-derived
/// parameters.
pub trait ConnectionContext: Send + Sync {
    fn domain_name(&self) -> String;

    /// Character encoding the server expects for string values (e.g. `UTF-8`).
    fn encoding(&self) -> String;

    /// Attributes read from the server root entry. May be empty.
    fn root_context_attributes(&self) -> BTreeMap<String, String>;
}

/// Static connection description, typically loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub domain_name: String,
    pub encoding: String,
    pub root_context: BTreeMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            domain_name: String::new(),
            encoding: "UTF-8".to_string(),
            root_context: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            ..Default::default()
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_root_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.root_context.insert(name.into(), value.into());
        self
    }
}

impl ConnectionContext for ConnectionConfig {
    fn domain_name(&self) -> String {
        self.domain_name.clone()
    }

    fn encoding(&self) -> String {
        self.encoding.clone()
    }

    fn root_context_attributes(&self) -> BTreeMap<String, String> {
        self.root_context.clone()
    }
}
