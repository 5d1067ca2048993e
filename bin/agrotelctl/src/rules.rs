//! ---
//! agrotel_section: "05-operator-interfaces"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Automation rule and alert configuration subcommands."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use agrotel_common::AppConfig;
use agrotel_sim::{AlertConfig, AutomationRule};
use agrotel_store::{FileRecordStore, RecordStore, ALERT_CONFIG_KEY, RULES_KEY};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// Print stored rules as JSON
    List,
    /// Add a rule from a JSON file, replacing any rule with the same id
    Add(FileArgs),
    /// Remove the rule with the given id
    Remove {
        /// Rule identifier
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// Print the effective alert configuration
    Show,
    /// Replace the alert configuration with the contents of a JSON file
    Set(FileArgs),
}

#[derive(Debug, Args)]
pub struct FileArgs {
    #[arg(long, value_name = "FILE")]
    pub file: PathBuf,
}

fn open_store(config: &AppConfig) -> Result<FileRecordStore> {
    FileRecordStore::open(&config.storage.directory).with_context(|| {
        format!(
            "failed to open record store at {}",
            config.storage.directory.display()
        )
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn run(config: &AppConfig, command: RulesCommand) -> Result<()> {
    let store = open_store(config)?;
    let mut rules: Vec<AutomationRule> = store.get(RULES_KEY)?.unwrap_or_default();
    match command {
        RulesCommand::List => {
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
        RulesCommand::Add(args) => {
            let rule: AutomationRule = read_json(&args.file)?;
            rule.validate()?;
            let id = rule.id.clone();
            match rules.iter_mut().find(|existing| existing.id == rule.id) {
                Some(existing) => *existing = rule,
                None => rules.push(rule),
            }
            store.save(RULES_KEY, &rules)?;
            info!(rule = %id, total = rules.len(), "rule stored");
            println!("stored rule {id}");
        }
        RulesCommand::Remove { id } => {
            let before = rules.len();
            rules.retain(|rule| rule.id != id);
            if rules.len() == before {
                bail!("no rule with id {id}");
            }
            store.save(RULES_KEY, &rules)?;
            info!(rule = %id, total = rules.len(), "rule removed");
            println!("removed rule {id}");
        }
    }
    Ok(())
}

pub fn run_alerts(config: &AppConfig, command: AlertsCommand) -> Result<()> {
    let store = open_store(config)?;
    match command {
        AlertsCommand::Show => {
            let alerts: AlertConfig = store.get(ALERT_CONFIG_KEY)?.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        AlertsCommand::Set(args) => {
            let alerts: AlertConfig = read_json(&args.file)?;
            store.save(ALERT_CONFIG_KEY, &alerts)?;
            info!(thresholds = alerts.thresholds.len(), "alert configuration stored");
            println!("stored alert configuration");
        }
    }
    Ok(())
}
