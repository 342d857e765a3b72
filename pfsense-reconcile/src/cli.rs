use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pfsense-reconcile")]
#[command(about = "Reconcile pfSense filter rules and user groups with a declared state")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Bring the appliance in line with a manifest.
    Apply(ApplyArgs),
    /// Show the scripts `apply` would run, without running them.
    Plan(PlanArgs),
    /// Print the entities currently configured on the appliance.
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    pub manifest: PathBuf,
    /// Compute changes but do not execute them.
    #[arg(long)]
    pub check: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print the executed scripts in text output.
    #[arg(long)]
    pub show_scripts: bool,
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    pub manifest: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[arg(value_enum)]
    pub kind: ShowKind,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

/// Overrides for the manifest's `[gateway]` table.
#[derive(Args, Debug, Clone, Default)]
pub struct GatewayArgs {
    /// Path of pfSsh.php on the appliance.
    #[arg(long)]
    pub shell: Option<PathBuf>,
    /// Command prefix used to run the shell, e.g. --command ssh --command root@fw.
    #[arg(long = "command", value_name = "ARG", conflicts_with = "snapshot")]
    pub prefix: Vec<String>,
    /// Work on an exported config.xml instead of a live appliance.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
    /// Write the snapshot back after a successful apply.
    #[arg(long)]
    pub write: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShowKind {
    Rules,
    Groups,
}
