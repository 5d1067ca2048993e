//! ---
//! agrotel_section: "01-core-functionality"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Shared primitives and utilities for the telemetry runtime."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
//! Core shared primitives for the Agrotel workspace.
//! This crate exposes configuration loading, tracing initialisation and
//! epoch-time helpers consumed by the simulator, the store and the CLI.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, SimulatorConfig, StorageConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::{epoch_millis, millis_to_datetime, HOUR_MS};
