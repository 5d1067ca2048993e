//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Automation rules and alert thresholds evaluated against readings."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::commands::CommandParameters;
use crate::sensors::{SensorReading, SensorType};
use crate::{Result, SimulatorError};

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub comparison: Comparison,
    pub threshold: f64,
}

/// Command fired when a rule triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub parameters: CommandParameters,
}

/// "When sensor X goes above/below T, send command C to device D."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    pub sensor_id: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AutomationRule {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SimulatorError::InvalidRule("rule id cannot be empty".into()));
        }
        if self.sensor_id.trim().is_empty() || self.action.device_id.trim().is_empty() {
            return Err(SimulatorError::InvalidRule(format!(
                "rule {} must name a sensor and a device",
                self.id
            )));
        }
        if !self.condition.threshold.is_finite() {
            return Err(SimulatorError::InvalidRule(format!(
                "rule {} has a non-finite threshold",
                self.id
            )));
        }
        Ok(())
    }

    pub fn matches(&self, reading: &SensorReading) -> bool {
        self.enabled
            && reading.id == self.sensor_id
            && self
                .condition
                .comparison
                .holds(reading.value, self.condition.threshold)
    }
}

/// Rules in `rules` that trigger for `reading`, in list order.
pub fn triggered<'a>(
    rules: &'a [AutomationRule],
    reading: &'a SensorReading,
) -> impl Iterator<Item = &'a AutomationRule> + 'a {
    rules.iter().filter(move |rule| rule.matches(reading))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Which side of a threshold a reading fell on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "breach", rename_all = "snake_case")]
pub enum AlertBreach {
    BelowMin { min: f64 },
    AboveMax { max: f64 },
}

/// Alert thresholds per sensor type plus notification channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub thresholds: BTreeMap<SensorType, AlertThreshold>,
    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_sms: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let thresholds = BTreeMap::from([
            (
                SensorType::Moisture,
                AlertThreshold {
                    min: Some(30.0),
                    max: Some(60.0),
                },
            ),
            (
                SensorType::Temperature,
                AlertThreshold {
                    min: Some(10.0),
                    max: Some(35.0),
                },
            ),
            (
                SensorType::Ph,
                AlertThreshold {
                    min: Some(5.5),
                    max: Some(7.5),
                },
            ),
        ]);
        Self {
            thresholds,
            notify_email: true,
            notify_sms: false,
        }
    }
}

impl AlertConfig {
    pub fn evaluate(&self, reading: &SensorReading) -> Option<AlertBreach> {
        let threshold = self.thresholds.get(&reading.sensor_type)?;
        match (threshold.min, threshold.max) {
            (Some(min), _) if reading.value < min => Some(AlertBreach::BelowMin { min }),
            (_, Some(max)) if reading.value > max => Some(AlertBreach::AboveMax { max }),
            _ => None,
        }
    }
}
