//! ---
//! agrotel_section: "05-operator-interfaces"
//! agrotel_subsection: "binary"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Operator CLI for the telemetry simulator and rule store."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::path::PathBuf;

use agrotel_common::{init_tracing, AppConfig};
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod rules;
mod telemetry;

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["agrotel.toml", "/etc/agrotel/agrotel.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Agrotel farm telemetry control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Configuration file (overrides AGROTEL_CONFIG and the default search path)"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Connect to the simulator and stream sensor events as JSON lines")]
    Run(telemetry::RunArgs),
    #[command(about = "Print synthetic hourly history for a sensor")]
    History(telemetry::HistoryArgs),
    #[command(about = "Send a command to a device and print the acknowledgement")]
    Command(telemetry::CommandArgs),
    #[command(subcommand, about = "Manage stored automation rules")]
    Rules(rules::RulesCommand),
    #[command(subcommand, about = "Inspect or replace the alert configuration")]
    Alerts(rules::AlertsCommand),
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_path(path),
        None => AppConfig::load(DEFAULT_CONFIG_CANDIDATES),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("agrotelctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no subcommand given; see --help");
    };
    let config = load_config(cli.config.as_ref())?;
    init_tracing("agrotelctl", &config.logging)?;

    match command {
        Commands::Run(args) => telemetry::run(&config, args)?,
        Commands::History(args) => telemetry::history(&config, args)?,
        Commands::Command(args) => telemetry::command(&config, args)?,
        Commands::Rules(cmd) => rules::run(&config, cmd)?,
        Commands::Alerts(cmd) => rules::run_alerts(&config, cmd)?,
    }
    Ok(())
}
