//! ---
//! agrotel_section: "11-simulation"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Consumer-side view of the latest reading per sensor."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use crate::sensors::{SensorEvent, SensorReading};
use crate::{Result, SimulatorError};

/// Latest full reading per sensor, rebuilt from the event stream.
#[derive(Debug, Default, Clone)]
pub struct SensorBoard {
    readings: BTreeMap<String, SensorReading>,
}

impl SensorBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the resulting reading.
    ///
    /// Snapshots replace the stored reading; updates merge into it and fail
    /// for sensors the board has not seen a snapshot for.
    pub fn apply(&mut self, event: &SensorEvent) -> Result<&SensorReading> {
        match event {
            SensorEvent::Snapshot(reading) => {
                self.readings.insert(reading.id.clone(), reading.clone());
            }
            SensorEvent::Update(update) => {
                let reading = self
                    .readings
                    .get_mut(&update.id)
                    .ok_or_else(|| SimulatorError::UnknownSensor(update.id.clone()))?;
                reading.merge(update)?;
            }
        }
        self.readings
            .get(event.sensor_id())
            .ok_or_else(|| SimulatorError::UnknownSensor(event.sensor_id().to_owned()))
    }

    pub fn get(&self, id: &str) -> Option<&SensorReading> {
        self.readings.get(id)
    }

    pub fn readings(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorCatalog;

    #[test]
    fn snapshot_then_update_yields_merged_reading() {
        let spec = SensorCatalog::farm_default().get(0).cloned().expect("spec");
        let mut board = SensorBoard::new();
        board
            .apply(&SensorEvent::Snapshot(spec.seed_reading(1)))
            .expect("snapshot");
        let merged = board
            .apply(&SensorEvent::Update(spec.perturb(-2.04, 2)))
            .expect("update")
            .clone();
        assert_eq!(merged.value, 43.0);
        assert_eq!(merged.name, "Field A Soil Moisture");
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn update_before_snapshot_is_rejected() {
        let spec = SensorCatalog::farm_default().get(4).cloned().expect("spec");
        let mut board = SensorBoard::new();
        let err = board
            .apply(&SensorEvent::Update(spec.perturb(0.0, 1)))
            .unwrap_err();
        assert!(matches!(err, SimulatorError::UnknownSensor(id) if id == "sensor_005"));
        assert!(board.is_empty());
    }
}
