use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tagmerge",
    about = "Resolve tag and relation membership conflicts when combining map primitives",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Combine the primitives of a scenario and print the resulting commands
    Resolve(ResolveArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Scenario file (JSON) with primitives, relations and the target
    pub scenario: PathBuf,
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Skip the automatic resolution rules
    #[arg(long)]
    pub no_automatic: bool,
    /// Keep one value for a key
    #[arg(long = "decide", value_name = "KEY=VALUE")]
    pub decide: Vec<String>,
    /// Keep all values of a key, joined with ';'
    #[arg(long = "keep-all", value_name = "KEY")]
    pub keep_all: Vec<String>,
    /// Sum the numeric values of a key
    #[arg(long = "sum", value_name = "KEY")]
    pub sum: Vec<String>,
    /// Drop a key from the result
    #[arg(long = "drop", value_name = "KEY")]
    pub drop: Vec<String>,
    /// Remove every undecided relation membership
    #[arg(long, conflicts_with = "replace_member_conflicts")]
    pub remove_member_conflicts: bool,
    /// Point every undecided relation membership at the target
    #[arg(long)]
    pub replace_member_conflicts: bool,
    /// Role for every membership that is kept
    #[arg(long)]
    pub role: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration file to validate and print instead of the defaults
    pub path: Option<PathBuf>,
}
