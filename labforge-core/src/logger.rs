use crate::simulation::{
    history::Action,
    state::SessionEvent,
    vessel::VesselSnapshot,
};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// One row of the action log: the command that was accepted and the vessel
/// as it stood afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub row: u64,
    pub command: String,
    pub sequence: Option<u64>,
    pub reagent_id: Option<String>,
    pub volume_ml: Option<f64>,
    pub total_volume_ml: f64,
    pub moles_json: String,
    pub has_indicator: bool,
    pub ph: Option<f64>,
    pub current_step: Option<u32>,
    pub events_json: String,
}

pub struct ActionLogger {
    writer: Writer<fs::File>,
    rows: u64,
}

impl ActionLogger {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn log_command(
        &mut self,
        command: &str,
        reagent_id: Option<&str>,
        action: Option<&Action>,
        vessel: &VesselSnapshot,
        current_step: Option<u32>,
        events: &[SessionEvent],
    ) -> Result<(), anyhow::Error> {
        let moles_json = serde_json::to_string(&vessel.moles_by_role)?;
        let events_json = serde_json::to_string(events)?;

        self.rows += 1;
        let entry = LogEntry {
            row: self.rows,
            command: command.to_string(),
            sequence: action.map(|a| a.sequence),
            reagent_id: reagent_id
                .map(str::to_string)
                .or_else(|| action.and_then(|a| a.reagent_id.clone())),
            volume_ml: action.and_then(|a| a.volume_ml),
            total_volume_ml: vessel.total_volume_ml,
            moles_json,
            has_indicator: vessel.has_indicator,
            ph: action.and_then(|a| a.resulting_ph),
            current_step,
            events_json,
        };

        self.writer.serialize(entry)?;
        self.writer.flush()?;
        Ok(())
    }
}
