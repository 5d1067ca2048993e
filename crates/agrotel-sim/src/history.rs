//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Synthetic hourly history for chart panels."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use agrotel_common::HOUR_MS;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of synthetic historical values.
pub const HISTORY_MIN: f64 = 20.0;
/// Upper bound (exclusive) of synthetic historical values.
pub const HISTORY_MAX: f64 = 70.0;

/// Window requested by a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryRange {
    #[default]
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
}

impl HistoryRange {
    /// Parse a range label; anything unrecognised means the last hour.
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim() {
            "24h" => HistoryRange::LastDay,
            "7d" => HistoryRange::LastWeek,
            _ => HistoryRange::LastHour,
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            HistoryRange::LastHour => 1,
            HistoryRange::LastDay => 24,
            HistoryRange::LastWeek => 168,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryRange::LastHour => "1h",
            HistoryRange::LastDay => "24h",
            HistoryRange::LastWeek => "7d",
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HistoryRange {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lenient(s))
    }
}

impl From<&str> for HistoryRange {
    fn from(label: &str) -> Self {
        Self::parse_lenient(label)
    }
}

/// One hourly sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub timestamp: i64,
    pub value: f64,
    pub sensor_id: String,
}

/// Build `hours + 1` points spaced one hour apart, oldest first, the last one
/// stamped `now`.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    sensor_id: &str,
    range: HistoryRange,
    now: i64,
) -> Vec<HistoricalPoint> {
    let hours = range.hours();
    (0..=hours)
        .map(|i| HistoricalPoint {
            timestamp: now - (hours - i) * HOUR_MS,
            value: rng.gen_range(HISTORY_MIN..HISTORY_MAX),
            sensor_id: sensor_id.to_owned(),
        })
        .collect()
}
