//! ---
//! agrotel_section: "01-core-functionality"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Runtime helpers supporting the telemetry simulator."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
//! Tick scheduling for timer-driven components. Production code runs on a
//! tokio interval; tests drive ticks by hand through [`ManualScheduler`].

pub mod scheduling;

pub use scheduling::{IntervalScheduler, ManualScheduler, TickScheduler, Ticker};
