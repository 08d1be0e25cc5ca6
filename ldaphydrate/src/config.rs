//! TOML configuration: connection description, parameter overrides and object schemas.
//!
//! ```toml
//! [connection]
//! domain_name = "example.com"
//! encoding = "UTF-8"
//!
//! [connection.root_context]
//! defaultNamingContext = "dc=example,dc=com"
//!
//! [parameters]
//! _domainname_ = "corp.example.com"
//!
//! [objects.user]
//! default_container = "ou=users,%_defaultnamingcontext_%"
//!
//! [objects.user.attributes]
//! name = "cn"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionConfig;
use crate::errors::{HydrateError, HydrateResult};
use crate::schema::ObjectSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrateConfig {
    pub connection: Option<ConnectionConfig>,
    /// Caller-supplied parameters; these win over connection-derived defaults.
    pub parameters: BTreeMap<String, String>,
    /// Object type → schema.
    pub objects: BTreeMap<String, ObjectSchema>,
}

impl HydrateConfig {
    pub fn from_path(path: impl AsRef<Path>) -> HydrateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            HydrateError::configuration(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> HydrateResult<Self> {
        let mut config: HydrateConfig = toml::from_str(content)
            .map_err(|err| HydrateError::configuration(format!("invalid configuration: {err}")))?;
        for (object_type, schema) in &mut config.objects {
            if schema.object_type.is_empty() {
                schema.object_type = object_type.clone();
            }
        }
        Ok(config)
    }

    /// Schema for an object type, matched case-insensitively.
    pub fn schema(&self, object_type: &str) -> Option<&ObjectSchema> {
        self.objects
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(object_type))
            .map(|(_, schema)| schema)
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}
