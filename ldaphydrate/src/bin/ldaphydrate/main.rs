mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    converters::handle_converters,
    hydrate::{HYDRATE_EXAMPLES, HydrateArgs, handle_hydrate},
    read::{READ_EXAMPLES, ReadArgs, handle_read},
};
use output::{GlobalOptions, OutputFormat, OutputManager};

#[derive(Parser)]
#[command(name = "ldaphydrate", version)]
#[command(about = "Convert logical directory operations into their LDAP protocol form")]
#[command(after_help = "Set RUST_LOG=ldaphydrate=debug to trace conversions and aggregation.")]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Print nothing but errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hydrate an add, batch modify or query operation against an object schema
    #[command(after_long_help = HYDRATE_EXAMPLES)]
    Hydrate(HydrateArgs),

    /// Convert a raw directory entry into logical attributes
    #[command(after_long_help = READ_EXAMPLES)]
    Read(ReadArgs),

    /// List registered attribute converters and what they can do
    Converters,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli.command, &output) {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn execute(command: Commands, output: &OutputManager) -> Result<()> {
    match command {
        Commands::Hydrate(args) => handle_hydrate(args, output),
        Commands::Read(args) => handle_read(args, output),
        Commands::Converters => handle_converters(output),
    }
}
