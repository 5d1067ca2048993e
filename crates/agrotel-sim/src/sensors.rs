//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Sensor catalog, readings and partial update events."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{Result, SimulatorError};

/// Measurement kind reported by a sensor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SensorType {
    Temperature,
    Moisture,
    Ph,
}

/// Static geographic position of a sensor, display only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Fixed description of one simulated sensor and its generation envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub id: String,
    pub name: String,
    pub sensor_type: SensorType,
    pub unit: String,
    /// Centre of generated values.
    pub base: f64,
    /// Full width of the perturbation window around `base`.
    pub range: f64,
    pub location: GeoPoint,
}

impl SensorSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        sensor_type: SensorType,
        unit: impl Into<String>,
        base: f64,
        range: f64,
        location: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sensor_type,
            unit: unit.into(),
            base,
            range,
            location,
        }
    }

    /// Reading carrying the seed value, as emitted in the connect snapshot.
    pub fn seed_reading(&self, timestamp: i64) -> SensorReading {
        SensorReading {
            id: self.id.clone(),
            name: self.name.clone(),
            sensor_type: self.sensor_type,
            value: self.base,
            unit: self.unit.clone(),
            timestamp,
            location: self.location,
            trend: 0.0,
        }
    }

    /// Apply a perturbation drawn from `[-range/2, range/2)` to the base value.
    ///
    /// The value is clamped at zero and rounded to one decimal place; the
    /// trend keeps the raw perturbation.
    pub fn perturb(&self, perturbation: f64, timestamp: i64) -> SensorUpdate {
        let value = round_to_tenth((self.base + perturbation).max(0.0));
        SensorUpdate {
            id: self.id.clone(),
            value,
            timestamp,
            trend: perturbation,
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ordered, non-empty set of sensors driven by a simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorCatalog {
    sensors: Vec<SensorSpec>,
}

impl SensorCatalog {
    /// Build a catalog, rejecting empty sets, duplicate ids and bad envelopes.
    pub fn new(sensors: Vec<SensorSpec>) -> Result<Self> {
        if sensors.is_empty() {
            return Err(SimulatorError::InvalidCatalog(
                "catalog must contain at least one sensor".into(),
            ));
        }
        let mut seen = HashSet::new();
        for sensor in &sensors {
            if !seen.insert(sensor.id.as_str()) {
                return Err(SimulatorError::InvalidCatalog(format!(
                    "duplicate sensor id {}",
                    sensor.id
                )));
            }
            if !sensor.base.is_finite() || !sensor.range.is_finite() || sensor.range < 0.0 {
                return Err(SimulatorError::InvalidCatalog(format!(
                    "sensor {} has an invalid base/range",
                    sensor.id
                )));
            }
        }
        Ok(Self { sensors })
    }

    /// The five field sensors shipped with the farm dashboard.
    pub fn farm_default() -> Self {
        Self {
            sensors: vec![
                SensorSpec::new(
                    "sensor_001",
                    "Field A Soil Moisture",
                    SensorType::Moisture,
                    "%",
                    45.0,
                    10.0,
                    GeoPoint::new(36.7783, -119.4179),
                ),
                SensorSpec::new(
                    "sensor_002",
                    "Greenhouse Air Temperature",
                    SensorType::Temperature,
                    "°C",
                    24.0,
                    4.0,
                    GeoPoint::new(36.7791, -119.4165),
                ),
                SensorSpec::new(
                    "sensor_003",
                    "Field A Soil pH",
                    SensorType::Ph,
                    "pH",
                    6.5,
                    0.6,
                    GeoPoint::new(36.7779, -119.4183),
                ),
                SensorSpec::new(
                    "sensor_004",
                    "Field B Soil Moisture",
                    SensorType::Moisture,
                    "%",
                    38.0,
                    12.0,
                    GeoPoint::new(36.7802, -119.4201),
                ),
                SensorSpec::new(
                    "sensor_005",
                    "Field B Soil Temperature",
                    SensorType::Temperature,
                    "°C",
                    18.0,
                    3.0,
                    GeoPoint::new(36.7808, -119.4192),
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SensorSpec> {
        self.sensors.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&SensorSpec> {
        self.sensors.iter().find(|sensor| sensor.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorSpec> {
        self.sensors.iter()
    }
}

impl Default for SensorCatalog {
    fn default() -> Self {
        Self::farm_default()
    }
}

/// Full sensor record. Only `value`, `timestamp` and `trend` change after
/// the first emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub location: GeoPoint,
    pub trend: f64,
}

impl SensorReading {
    /// Merge the variable fields of `update` into this reading.
    pub fn merge(&mut self, update: &SensorUpdate) -> Result<()> {
        if update.id != self.id {
            return Err(SimulatorError::SensorMismatch {
                expected: self.id.clone(),
                found: update.id.clone(),
            });
        }
        if !update.value.is_finite() || !update.trend.is_finite() {
            return Err(SimulatorError::InvalidReading {
                id: update.id.clone(),
                value: update.value,
            });
        }
        self.value = update.value;
        self.timestamp = update.timestamp;
        self.trend = update.trend;
        Ok(())
    }
}

/// Changed fields produced by a timer tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorUpdate {
    pub id: String,
    pub value: f64,
    pub timestamp: i64,
    pub trend: f64,
}

/// Event delivered to sensor subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorEvent {
    /// Full reading sent once per sensor inside `connect`.
    Snapshot(SensorReading),
    /// Partial reading sent on each timer tick.
    Update(SensorUpdate),
}

impl SensorEvent {
    pub fn sensor_id(&self) -> &str {
        match self {
            SensorEvent::Snapshot(reading) => &reading.id,
            SensorEvent::Update(update) => &update.id,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, SensorEvent::Snapshot(_))
    }
}
