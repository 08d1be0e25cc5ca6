//! `%name%` placeholder substitution in DN-like strings (base DNs, container paths).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::connection::{CONFIGURATION_NAMING_CONTEXT, ConnectionContext, DEFAULT_NAMING_CONTEXT};
use crate::errors::{HydrateError, HydrateResult};

pub const DOMAIN_NAME: &str = "_domainname_";
pub const DEFAULT_NAMING_CONTEXT_PARAM: &str = "_defaultnamingcontext_";
pub const CONFIGURATION_NAMING_CONTEXT_PARAM: &str = "_configurationnamingcontext_";

static PARAMETER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z0-9_-]+)%").expect("parameter token pattern is valid"));

fn normalize(name: &str) -> String {
    name.trim_matches('%').to_ascii_lowercase()
}

/// Parameter name → replacement text. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    parameters: BTreeMap<String, String>,
}

impl ParameterResolver {
    pub fn new<K: AsRef<str>, V: Into<String>>(parameters: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(name, value)| (normalize(name.as_ref()), value.into()))
                .collect(),
        }
    }

    /// Default parameters derived from the connection, overlaid with `overrides`.
    pub fn for_connection<K: AsRef<str>, V: Into<String>>(
        connection: Option<&dyn ConnectionContext>,
        overrides: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let mut resolver = Self::new(default_parameters(connection));
        for (name, value) in overrides {
            resolver.set(name.as_ref(), value);
        }
        resolver
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.parameters.insert(normalize(name), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(&normalize(name)).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn has_parameters(value: &str) -> bool {
        PARAMETER_TOKEN.is_match(value)
    }

    /// Substitute every known token. Unknown tokens stay in place as literal text.
    pub fn resolve(&self, value: &str) -> HydrateResult<String> {
        let mut stack = Vec::new();
        self.resolve_inner(value, &mut stack)
    }

    fn resolve_inner(&self, value: &str, stack: &mut Vec<String>) -> HydrateResult<String> {
        let mut resolved = String::with_capacity(value.len());
        let mut last = 0;
        for captures in PARAMETER_TOKEN.captures_iter(value) {
            let (Some(token), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            resolved.push_str(&value[last..token.start()]);
            last = token.end();

            let key = name.as_str().to_ascii_lowercase();
            let Some(replacement) = self.parameters.get(&key) else {
                warn!("parameter '{}' is not defined; leaving it in '{value}'", token.as_str());
                resolved.push_str(token.as_str());
                continue;
            };
            if stack.contains(&key) {
                return Err(HydrateError::configuration(format!(
                    "parameter '{key}' references itself through {}",
                    stack.join(" -> ")
                )));
            }
            stack.push(key);
            let expanded = self.resolve_inner(replacement, stack)?;
            stack.pop();
            resolved.push_str(&expanded);
        }
        resolved.push_str(&value[last..]);
        Ok(resolved)
    }
}

/// Domain name and well-known naming contexts exposed by the connection, when present.
pub fn default_parameters(connection: Option<&dyn ConnectionContext>) -> BTreeMap<String, String> {
    let mut defaults = BTreeMap::new();
    let Some(connection) = connection else {
        return defaults;
    };
    let domain = connection.domain_name();
    if !domain.is_empty() {
        defaults.insert(DOMAIN_NAME.to_string(), domain);
    }
    let root = connection.root_context_attributes();
    for (attribute, parameter) in [
        (DEFAULT_NAMING_CONTEXT, DEFAULT_NAMING_CONTEXT_PARAM),
        (CONFIGURATION_NAMING_CONTEXT, CONFIGURATION_NAMING_CONTEXT_PARAM),
    ] {
        if let Some((_, value)) = root.iter().find(|(name, _)| name.eq_ignore_ascii_case(attribute)) {
            defaults.insert(parameter.to_string(), value.clone());
        }
    }
    defaults
}
