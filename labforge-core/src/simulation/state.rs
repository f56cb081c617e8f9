use crate::{
    equilibrium::{ColorBand, Regime},
    simulation::vessel::VesselSnapshot,
};
use serde::{Deserialize, Serialize};

/// Emitted by the session while handling a command, for the presentation
/// layer to react to. Cleared at the start of every command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ReagentAdded { reagent_id: String, volume_ml: f64 },
    IndicatorPlaced,
    PhMeasured { label: String, ph: f64, color_band: ColorBand },
    StepCompleted { step_id: u32 },
    StepReopened { step_id: u32 },
    ExperimentCompleted,
    ActionUndone { sequence: u64 },
    ReagentCleared { reagent_id: String },
    SessionReset,
    /// Results are worth revealing; the caller may arm a deferred reveal.
    ResultsReady,
    /// The command was applied but its action log row could not be written.
    LogWriteFailed { reason: String },
}

/// Result of a successful pH measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub label: String,
    pub ph: f64,
    pub color_band: ColorBand,
    pub regime: Regime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    pub label: String,
    pub ph: f64,
}

/// Label -> last pH measured under that label, in first-measured order.
/// Written only by measurements; not retracted by undo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementRecord {
    entries: Vec<MeasurementEntry>,
    latest: Option<usize>,
}

impl MeasurementRecord {
    pub fn record(&mut self, label: &str, ph: f64) {
        let index = match self.entries.iter().position(|e| e.label == label) {
            Some(i) => {
                self.entries[i].ph = ph;
                i
            }
            None => {
                self.entries.push(MeasurementEntry {
                    label: label.to_string(),
                    ph,
                });
                self.entries.len() - 1
            }
        };
        self.latest = Some(index);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.ph)
    }

    /// Smallest `sample N` label, counting from `len() + 1`, that no
    /// reading is stored under yet.
    pub fn next_sample_label(&self) -> String {
        let mut n = self.entries.len() + 1;
        loop {
            let label = format!("sample {}", n);
            if self.get(&label).is_none() {
                return label;
            }
            n += 1;
        }
    }

    /// The entry written by the most recent measurement.
    pub fn latest(&self) -> Option<&MeasurementEntry> {
        self.latest.and_then(|i| self.entries.get(i))
    }

    pub fn entries(&self) -> &[MeasurementEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest = None;
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Vessel(VesselSnapshot),
    Measurement(Measurement),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relabelled_measurement_overwrites_in_place() {
        let mut record = MeasurementRecord::default();
        record.record("0.1 M", 1.0);
        record.record("0.01 M", 2.0);
        record.record("0.1 M", 1.02);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("0.1 M"), Some(1.02));
        assert_eq!(record.entries()[0].label, "0.1 M");
        assert_eq!(record.latest().map(|e| e.label.as_str()), Some("0.1 M"));
    }

    #[test]
    fn sample_label_skips_labels_already_taken() {
        let mut record = MeasurementRecord::default();
        assert_eq!(record.next_sample_label(), "sample 1");
        record.record("sample 2", 1.0);
        assert_eq!(record.next_sample_label(), "sample 3");
        record.record("sample 3", 1.3);
        record.record("sample 4", 1.5);
        assert_eq!(record.next_sample_label(), "sample 5");
    }

    #[test]
    fn clear_forgets_latest() {
        let mut record = MeasurementRecord::default();
        record.record("a", 4.0);
        record.clear();
        assert!(record.is_empty());
        assert!(record.latest().is_none());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&SessionEvent::StepCompleted { step_id: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"step_completed","step_id":2}"#);
    }
}
