//! ---
//! agrotel_section: "05-operator-interfaces"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Streaming, history and command subcommands."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::time::Duration;

use agrotel_common::{millis_to_datetime, AppConfig};
use agrotel_logging::{agt_info, agt_warn, LogContext};
use agrotel_sim::{
    AlertConfig, AutomationRule, CommandParameters, HistoryRange, SensorBoard, SensorEvent,
    TelemetrySimulator,
};
use agrotel_store::{FileRecordStore, RecordStore, ALERT_CONFIG_KEY, RULES_KEY};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use prometheus::{Encoder, TextEncoder};
use serde_json::Value as JsonValue;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Stop streaming after this many seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub duration_secs: u64,
    /// Dispatch stored automation rules when readings cross their thresholds
    #[arg(long)]
    pub apply_rules: bool,
    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Sensor identifier, e.g. sensor_001
    pub sensor_id: String,
    /// Time window: 1h, 24h or 7d (anything else reads as 1h)
    #[arg(long, value_name = "RANGE", default_value = "1h")]
    pub range: String,
}

#[derive(Debug, Args)]
pub struct CommandArgs {
    /// Target device identifier
    pub device_id: String,
    /// Command name, e.g. start_irrigation
    pub command: String,
    /// Command parameter as key=value; values are parsed as JSON when possible
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

pub fn run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(stream(config, args))
}

pub fn history(config: &AppConfig, args: HistoryArgs) -> Result<()> {
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let simulator = TelemetrySimulator::farm_default(config.simulator.clone())?;
        if simulator.catalog().find(&args.sensor_id).is_none() {
            agt_warn!(
                context = LogContext::new().with_sensor(&args.sensor_id),
                "sensor is not in the farm catalog; history is synthetic regardless"
            );
        }
        let range = HistoryRange::parse_lenient(&args.range);
        let points = simulator.get_historical_data(&args.sensor_id, range).await;
        println!("{}", serde_json::to_string_pretty(&points)?);
        simulator.dispose();
        Ok::<_, anyhow::Error>(())
    })
}

pub fn command(config: &AppConfig, args: CommandArgs) -> Result<()> {
    let parameters = parse_params(&args.params)?;
    let runtime = Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let simulator = TelemetrySimulator::farm_default(config.simulator.clone())?;
        let ack = simulator
            .send_command(&args.device_id, &args.command, parameters)
            .await;
        println!("{}", serde_json::to_string_pretty(&ack)?);
        simulator.dispose();
        Ok::<_, anyhow::Error>(())
    })
}

async fn stream(config: &AppConfig, args: RunArgs) -> Result<()> {
    let (rules, alerts) = if args.apply_rules {
        let store = FileRecordStore::open(&config.storage.directory).with_context(|| {
            format!(
                "failed to open record store at {}",
                config.storage.directory.display()
            )
        })?;
        let rules: Vec<AutomationRule> = store.get(RULES_KEY)?.unwrap_or_default();
        let alerts: AlertConfig = store.get(ALERT_CONFIG_KEY)?.unwrap_or_default();
        (rules, alerts)
    } else {
        (Vec::new(), AlertConfig::default())
    };

    let simulator = TelemetrySimulator::farm_default(config.simulator.clone())?;
    let (tx, mut rx) = mpsc::unbounded_channel::<SensorEvent>();
    let _events = simulator.on_sensor_update(move |event| {
        // Receiver gone means the run loop already finished.
        let _ = tx.send(event.clone());
    });
    let _connection = simulator.on_connection_change(|connected| {
        agt_info!("telemetry link {}", if connected { "up" } else { "down" });
    });
    simulator.connect()?;

    let mut board = SensorBoard::new();
    let mut dispatches = JoinSet::new();
    let deadline = tokio::time::sleep(Duration::from_secs(args.duration_secs));
    tokio::pin!(deadline);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            Some(event) = rx.recv() => {
                println!("{}", serde_json::to_string(&event)?);
                let reading = board.apply(&event)?.clone();
                if let Some(breach) = alerts.evaluate(&reading) {
                    let at = millis_to_datetime(reading.timestamp)
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_default();
                    agt_warn!(
                        context = LogContext::new().with_sensor(&reading.id),
                        "{} reading {} {} at {} outside alert band: {:?}",
                        reading.sensor_type,
                        reading.value,
                        reading.unit,
                        at,
                        breach
                    );
                }
                for rule in agrotel_sim::rules::triggered(&rules, &reading) {
                    let simulator = simulator.clone();
                    let action = rule.action.clone();
                    dispatches.spawn(async move {
                        simulator
                            .send_command(&action.device_id, &action.command, action.parameters)
                            .await
                    });
                }
            }
            Some(done) = dispatches.join_next() => {
                let ack = done.context("command dispatch failed")?;
                println!("{}", serde_json::to_string(&ack)?);
            }
            _ = &mut deadline => break,
            _ = &mut shutdown => {
                agt_info!("interrupted; disconnecting");
                break;
            }
        }
    }

    if !dispatches.is_empty() {
        agt_info!("dropping {} in-flight command dispatches", dispatches.len());
        dispatches.abort_all();
    }
    simulator.disconnect();
    if args.metrics {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&simulator.metrics_registry().gather(), &mut buffer)
            .context("failed to encode metrics")?;
        print!("{}", String::from_utf8(buffer)?);
    }
    simulator.dispose();
    Ok(())
}

fn parse_params(raw: &[String]) -> Result<CommandParameters> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("parameter {pair:?} is not in KEY=VALUE form"))?;
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| JsonValue::String(value.to_owned()));
            Ok((key.to_owned(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_prefer_json_and_fall_back_to_strings() {
        let params = parse_params(&[
            "duration=30".to_owned(),
            "zone=north".to_owned(),
            "flags={\"dry_run\":true}".to_owned(),
        ])
        .expect("params");
        assert_eq!(params["duration"], json!(30));
        assert_eq!(params["zone"], json!("north"));
        assert_eq!(params["flags"], json!({"dry_run": true}));
    }

    #[test]
    fn params_without_separator_are_rejected() {
        assert!(parse_params(&["duration".to_owned()]).is_err());
    }
}
