//! ---
//! agrotel_section: "01-core-functionality"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Shared primitives and utilities for the telemetry runtime."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use chrono::{DateTime, TimeZone, Utc};

/// One hour expressed in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds back into a UTC timestamp for display.
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
