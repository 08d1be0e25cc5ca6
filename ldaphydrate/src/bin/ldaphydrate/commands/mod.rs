pub mod converters;
pub mod hydrate;
pub mod read;

use std::path::Path;

use anyhow::{Context, Result};
use ldaphydrate::{AttributeValue, HydrateConfig, ObjectSchema, Operation, QueryFilter};
use serde::de::DeserializeOwned;

pub fn load_config(path: &Path) -> Result<HydrateConfig> {
    HydrateConfig::from_path(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

pub fn find_schema<'c>(config: &'c HydrateConfig, object: &str) -> Result<&'c ObjectSchema> {
    config.schema(object).with_context(|| {
        let known: Vec<&str> = config.object_types().collect();
        format!("No schema for object type '{object}' (configured: {})", known.join(", "))
    })
}

/// Parse JSON given inline (starting with `{`) or from a file path.
pub fn read_json<T: DeserializeOwned>(input: &str, what: &str) -> Result<T> {
    let content = if input.trim_start().starts_with('{') {
        input.to_string()
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {what} from {input}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {what} JSON"))
}

pub fn format_values(value: &AttributeValue) -> String {
    value
        .values()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One-line description of an operation.
pub fn summarize(operation: &Operation) -> String {
    match operation {
        Operation::Add(add) => format!(
            "add {} ({} attributes)",
            add.dn.as_deref().unwrap_or("<no dn>"),
            add.attributes.len()
        ),
        Operation::BatchModify(modify) => {
            let batches: Vec<String> = modify
                .batches
                .iter()
                .map(|b| {
                    let action = format!("{:?}", b.action).to_lowercase();
                    format!("{action} {}={}", b.attribute, format_values(&b.values))
                })
                .collect();
            format!("batch_modify {} [{}]", modify.dn, batches.join("; "))
        }
        Operation::Query(query) => {
            let filter = match &query.filter {
                QueryFilter::Raw(raw) => raw.clone(),
                QueryFilter::Operators(_) => "<unrendered>".to_string(),
            };
            format!("query {filter} base={}", query.base_dn.as_deref().unwrap_or("<none>"))
        }
    }
}
