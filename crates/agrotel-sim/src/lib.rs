//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "01-bootstrap"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Simulation module exports and shared types."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
//! Simulated farm telemetry for the Agrotel dashboard.
//!
//! [`TelemetrySimulator`] owns a connection state machine, two subscriber
//! registries and a repeating timer that perturbs a fixed set of sensors.
//! Command dispatch and historical queries are latency-only stubs.

pub mod board;
pub mod commands;
pub mod history;
pub mod metrics;
pub mod registry;
pub mod rules;
pub mod sensors;
pub mod simulator;

/// Shared result type for simulator operations.
pub type Result<T> = std::result::Result<T, SimulatorError>;

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("simulator has been disposed")]
    Disposed,
    #[error("no tokio runtime available to drive the simulator timer")]
    NoRuntime,
    #[error("update for sensor {found} cannot be merged into reading {expected}")]
    SensorMismatch { expected: String, found: String },
    #[error("sensor {id} produced a non-finite value {value}")]
    InvalidReading { id: String, value: f64 },
    #[error("unknown sensor: {0}")]
    UnknownSensor(String),
    #[error("invalid sensor catalog: {0}")]
    InvalidCatalog(String),
    #[error("invalid automation rule: {0}")]
    InvalidRule(String),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub use board::SensorBoard;
pub use commands::{CommandAck, CommandParameters, COMMAND_ACK_MESSAGE};
pub use history::{HistoricalPoint, HistoryRange};
pub use metrics::{MetricsSnapshot, SimulatorMetrics};
pub use registry::{DeliveryReport, Subscription};
pub use rules::{
    AlertBreach, AlertConfig, AlertThreshold, AutomationRule, Comparison, RuleAction,
    RuleCondition,
};
pub use sensors::{
    GeoPoint, SensorCatalog, SensorEvent, SensorReading, SensorSpec, SensorType, SensorUpdate,
};
pub use simulator::TelemetrySimulator;
