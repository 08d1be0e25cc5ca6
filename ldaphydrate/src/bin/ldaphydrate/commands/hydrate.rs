use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use ldaphydrate::{ConverterRegistry, Operation, OperationHydrator, QueryFilter};
use serde::Serialize;

use super::{find_schema, format_values, load_config, read_json, summarize};
use crate::output::{OutputManager, TableDisplay};

pub const HYDRATE_EXAMPLES: &str = r#"Examples:
  ldaphydrate hydrate --config directory.toml --object user --operation '{"type":"add","attributes":{"name":"jdoe"}}'
  ldaphydrate hydrate --config directory.toml --object user --operation modify.json --dn cn=jdoe,ou=users,dc=example,dc=com
  ldaphydrate --output json hydrate --config directory.toml --object user --operation query.json --alias u"#;

#[derive(Args)]
pub struct HydrateArgs {
    /// Configuration file holding the connection, parameters and object schemas
    #[arg(long, env = "LDAPHYDRATE_CONFIG")]
    pub config: PathBuf,

    /// Object type whose schema applies
    #[arg(long)]
    pub object: String,

    /// Operation as inline JSON or a path to a JSON file
    #[arg(long)]
    pub operation: String,

    /// DN of the entry, for converters that need it
    #[arg(long)]
    pub dn: Option<String>,

    /// Alias of the object in a joined query
    #[arg(long)]
    pub alias: Option<String>,
}

#[derive(Serialize)]
struct HydrationReport {
    operation: Operation,
    queued: Vec<Operation>,
}

impl TableDisplay for HydrationReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Field", "Value"]);
        table.add_row(vec![Cell::new("type"), Cell::new(self.operation.kind())]);

        match &self.operation {
            Operation::Add(add) => {
                table.add_row(vec![Cell::new("dn"), Cell::new(add.dn.as_deref().unwrap_or(""))]);
                for (attribute, value) in &add.attributes {
                    table.add_row(vec![Cell::new(attribute), Cell::new(format_values(value))]);
                }
            }
            Operation::BatchModify(modify) => {
                table.add_row(vec![Cell::new("dn"), Cell::new(&modify.dn)]);
                for batch in &modify.batches {
                    table.add_row(vec![
                        Cell::new(format!("{:?} {}", batch.action, batch.attribute).to_lowercase()),
                        Cell::new(format_values(&batch.values)),
                    ]);
                }
            }
            Operation::Query(query) => {
                if let QueryFilter::Raw(filter) = &query.filter {
                    table.add_row(vec![Cell::new("filter"), Cell::new(filter)]);
                }
                table.add_row(vec![Cell::new("base dn"), Cell::new(query.base_dn.as_deref().unwrap_or(""))]);
                table.add_row(vec![Cell::new("attributes"), Cell::new(query.attributes.join(", "))]);
                table.add_row(vec![
                    Cell::new("scope"),
                    Cell::new(query.scope.map(|s| format!("{s:?}").to_lowercase()).unwrap_or_default()),
                ]);
                table.add_row(vec![
                    Cell::new("paging"),
                    Cell::new(query.use_paging.map(|p| p.to_string()).unwrap_or_default()),
                ]);
                for control in &query.controls {
                    let critical = if control.criticality { " (critical)" } else { "" };
                    table.add_row(vec![Cell::new("control"), Cell::new(format!("{}{critical}", control.oid))]);
                }
            }
        }

        for queued in &self.queued {
            table.add_row(vec![Cell::new("queued"), Cell::new(summarize(queued))]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let mut lines = vec![summarize(&self.operation)];
        lines.extend(self.queued.iter().map(|op| format!("queued: {}", summarize(op))));
        lines.join("\n")
    }
}

pub fn handle_hydrate(args: HydrateArgs, output: &OutputManager) -> Result<()> {
    let config = load_config(&args.config)?;
    let schema = find_schema(&config, &args.object)?;
    let registry = ConverterRegistry::with_builtins();
    let mut operation: Operation = read_json(&args.operation, "operation")?;

    let mut hydrator = OperationHydrator::new(&registry)
        .with_schema(schema)
        .with_parameters(&config.parameters);
    if let Some(connection) = &config.connection {
        hydrator = hydrator.with_connection(connection);
    }
    if let Some(alias) = &args.alias {
        hydrator = hydrator.with_alias(alias);
    }

    let queued = hydrator
        .hydrate_to_protocol(&mut operation, args.dn.as_deref())
        .with_context(|| format!("Failed to hydrate {} operation", operation.kind()))?;

    output.heading(&format!("Hydrated {} operation for '{}'", operation.kind(), args.object));
    let report = HydrationReport { operation, queued };
    output.display(&report)?;
    if !report.queued.is_empty() {
        output.info(&format!("{} side operation(s) must run after this one", report.queued.len()));
    }
    Ok(())
}
