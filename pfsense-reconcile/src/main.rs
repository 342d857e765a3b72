use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod apply_cmd;
mod cli;
mod connect;
mod show_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Apply(args) => apply_cmd::run_apply(args),
        Command::Plan(args) => apply_cmd::run_plan(args),
        Command::Show(args) => show_cmd::run_show(args),
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
