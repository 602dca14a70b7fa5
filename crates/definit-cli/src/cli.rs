use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "definit",
    about = "definit: release resources dropped between two state snapshots",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Release what `prev` holds and `next` no longer does
    Diff(ScenarioArgs),
    /// Release everything `prev` holds
    Deep(ScenarioArgs),
    /// Parse a scenario and describe its roots and resources
    Check(ScenarioArgs),
}

#[derive(Args)]
pub struct ScenarioArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,
}
