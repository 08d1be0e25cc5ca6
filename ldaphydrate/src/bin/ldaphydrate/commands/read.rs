use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use ldaphydrate::{AttributeMap, ConverterRegistry, OperationHydrator};
use serde::Serialize;

use super::{find_schema, format_values, load_config, read_json};
use crate::output::{OutputManager, TableDisplay};

pub const READ_EXAMPLES: &str = r#"Examples:
  ldaphydrate read --config directory.toml --object user --entry '{"cn":["jdoe"],"userAccountControl":["514"]}'
  ldaphydrate --output json read --config directory.toml --object user --entry entry.json"#;

#[derive(Args)]
pub struct ReadArgs {
    /// Configuration file holding the connection, parameters and object schemas
    #[arg(long, env = "LDAPHYDRATE_CONFIG")]
    pub config: PathBuf,

    /// Object type whose schema applies
    #[arg(long)]
    pub object: String,

    /// Raw entry (physical attribute → values) as inline JSON or a path to a JSON file
    #[arg(long)]
    pub entry: String,
}

#[derive(Serialize)]
#[serde(transparent)]
struct EntryReport {
    attributes: AttributeMap,
}

impl TableDisplay for EntryReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Attribute", "Value"]);
        for (attribute, value) in &self.attributes {
            table.add_row(vec![Cell::new(attribute), Cell::new(format_values(value))]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.attributes
            .iter()
            .map(|(attribute, value)| format!("{attribute}={}", format_values(value)))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub fn handle_read(args: ReadArgs, output: &OutputManager) -> Result<()> {
    let config = load_config(&args.config)?;
    let schema = find_schema(&config, &args.object)?;
    let registry = ConverterRegistry::with_builtins();
    let entry: AttributeMap = read_json(&args.entry, "entry")?;

    let attributes = OperationHydrator::new(&registry)
        .with_schema(schema)
        .hydrate_from_protocol(&entry)
        .context("Failed to read entry")?;

    output.heading(&format!("Entry as '{}'", args.object));
    let count = attributes.len();
    output.display(&EntryReport { attributes })?;
    output.success(&format!("{count} logical attribute(s) read"));
    Ok(())
}
