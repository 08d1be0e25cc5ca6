use anyhow::Result;
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

/// Kind of status line printed around a report.
#[derive(Clone, Copy, Debug)]
enum Status {
    Success,
    Error,
    Info,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Error => "✗",
            Status::Info => "ℹ",
        }
    }

    fn color(self) -> Color {
        match self {
            Status::Success => Color::Green,
            Status::Error => Color::Red,
            Status::Info => Color::Blue,
        }
    }
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Print a report in the configured format. Quiet mode prints nothing.
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Table => println!("{}", data.to_table(self)),
            OutputFormat::Compact => println!("{}", data.to_compact()),
        }
        Ok(())
    }

    /// Headings and status lines only accompany table output, so JSON and compact output stay
    /// machine-readable.
    pub fn is_decorated(&self) -> bool {
        !self.options.quiet && self.options.output_format == OutputFormat::Table
    }

    pub fn success(&self, message: &str) {
        if self.is_decorated() {
            println!("{}", self.status_line(Status::Success, message));
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.status_line(Status::Error, message));
    }

    pub fn info(&self, message: &str) {
        if self.is_decorated() {
            println!("{}", self.status_line(Status::Info, message));
        }
    }

    pub fn heading(&self, text: &str) {
        if !self.is_decorated() {
            return;
        }
        if self.options.no_color {
            println!("\n{text}\n{}", "=".repeat(text.chars().count()));
        } else {
            println!("\n{}", text.bright_blue().bold());
        }
    }

    pub fn bullet(&self, text: &str) {
        if self.is_decorated() {
            let marker = if self.options.no_color { "•".normal() } else { "•".bright_black() };
            println!("  {marker} {text}");
        }
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        if self.options.no_color {
            format!("{} {message}", status.marker())
        } else {
            format!("{} {}", status.marker().color(status.color()), message.color(status.color()))
        }
    }

    /// Table with box-drawing borders, or plain ASCII when color is off.
    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        table
    }

    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(header_cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct MappedAttribute {
        logical: &'static str,
        physical: &'static str,
    }

    impl TableDisplay for MappedAttribute {
        fn to_table(&self, output: &OutputManager) -> Table {
            let mut table = output.create_table();
            output.add_table_header(&mut table, &["Logical", "Physical"]);
            table.add_row(vec![Cell::new(self.logical), Cell::new(self.physical)]);
            table
        }

        fn to_compact(&self) -> String {
            format!("{}->{}", self.logical, self.physical)
        }
    }

    const FIRST_NAME: MappedAttribute = MappedAttribute {
        logical: "firstName",
        physical: "givenName",
    };

    fn manager(output_format: OutputFormat, quiet: bool) -> OutputManager {
        OutputManager::new(GlobalOptions {
            output_format,
            quiet,
            no_color: true,
        })
    }

    #[test]
    fn json_output_is_not_decorated() {
        let manager = manager(OutputFormat::Json, false);
        assert!(manager.display(&FIRST_NAME).is_ok());
        assert!(!manager.is_decorated());
    }

    #[test]
    fn table_output_is_decorated_unless_quiet() {
        assert!(manager(OutputFormat::Table, false).is_decorated());
        assert!(!manager(OutputFormat::Table, true).is_decorated());
    }

    #[test]
    fn status_lines_without_color() {
        let manager = manager(OutputFormat::Table, false);
        assert_eq!(manager.status_line(Status::Success, "3 logical attribute(s) read"), "✓ 3 logical attribute(s) read");
        assert_eq!(manager.status_line(Status::Error, "no schema"), "✗ no schema");
    }

    #[test]
    fn table_lists_headers_and_rows() {
        let manager = manager(OutputFormat::Table, false);
        let rendered = FIRST_NAME.to_table(&manager).to_string();
        assert!(rendered.contains("Logical"));
        assert!(rendered.contains("givenName"));
        assert_eq!(FIRST_NAME.to_compact(), "firstName->givenName");
    }
}
