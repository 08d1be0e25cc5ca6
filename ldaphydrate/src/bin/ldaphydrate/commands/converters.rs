use anyhow::Result;
use comfy_table::{Cell, Table};
use ldaphydrate::{ConverterCapabilities, ConverterRegistry};
use serde::Serialize;

use crate::output::{OutputManager, TableDisplay};

#[derive(Serialize)]
struct ConverterRow {
    name: String,
    #[serde(flatten)]
    capabilities: ConverterCapabilities,
}

#[derive(Serialize)]
#[serde(transparent)]
struct ConverterList(Vec<ConverterRow>);

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "-" }
}

impl TableDisplay for ConverterList {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Converter", "Multi-valued", "Aggregates", "Generates operations"]);
        for row in &self.0 {
            table.add_row(vec![
                Cell::new(&row.name),
                Cell::new(yes_no(row.capabilities.multi_valued)),
                Cell::new(yes_no(row.capabilities.aggregates)),
                Cell::new(yes_no(row.capabilities.generates_operations)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0.iter().map(|row| row.name.as_str()).collect::<Vec<_>>().join(" ")
    }
}

pub fn handle_converters(output: &OutputManager) -> Result<()> {
    let registry = ConverterRegistry::with_builtins();
    let rows = registry
        .names()
        .filter_map(|name| {
            registry.capabilities(name).map(|capabilities| ConverterRow {
                name: name.to_string(),
                capabilities,
            })
        })
        .collect();

    output.heading("Registered converters");
    output.display(&ConverterList(rows))?;
    output.bullet("Assign converters to logical attributes under [objects.<type>.converters]");
    Ok(())
}
