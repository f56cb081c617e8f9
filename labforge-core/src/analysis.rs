use crate::{
    equilibrium::{self, ColorBand, Regime},
    error::LabError,
    logger::LogEntry,
    simulation::{
        history::{History, TimelineEntry},
        state::{MeasurementEntry, MeasurementRecord},
        vessel::VesselSnapshot,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bounds, in moles of weak acid plus conjugate base.
pub const LOW_BUFFER_MOLES: f64 = 0.001;
pub const MODERATE_BUFFER_MOLES: f64 = 0.01;

/// A derived report value. Nothing numeric is shown until a measurement has
/// succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ReportField<T> {
    NoResultYet,
    Inconclusive,
    Value(T),
}

impl<T> ReportField<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            ReportField::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_no_result(&self) -> bool {
        matches!(self, ReportField::NoResultYet)
    }
}

impl<T: fmt::Display> fmt::Display for ReportField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportField::NoResultYet => f.write_str("no result yet"),
            ReportField::Inconclusive => f.write_str("inconclusive"),
            ReportField::Value(v) => fmt::Display::fmt(v, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferCapacity {
    NoBufferFormed,
    Low,
    Moderate,
    High,
}

impl BufferCapacity {
    pub fn classify(pair_moles: f64) -> Self {
        if pair_moles <= 0.0 {
            BufferCapacity::NoBufferFormed
        } else if pair_moles < LOW_BUFFER_MOLES {
            BufferCapacity::Low
        } else if pair_moles < MODERATE_BUFFER_MOLES {
            BufferCapacity::Moderate
        } else {
            BufferCapacity::High
        }
    }
}

impl fmt::Display for BufferCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BufferCapacity::NoBufferFormed => "no buffer formed",
            BufferCapacity::Low => "low",
            BufferCapacity::Moderate => "moderate",
            BufferCapacity::High => "high",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub experiment_id: String,
    pub experiment_name: String,
    pub measurements: Vec<MeasurementEntry>,
    pub measured_ph: ReportField<f64>,
    pub theoretical_ph: ReportField<f64>,
    /// Theoretical minus measured.
    pub deviation: ReportField<f64>,
    pub regime: ReportField<Regime>,
    pub buffer_capacity: ReportField<BufferCapacity>,
    pub composition_changed_since_measurement: bool,
    pub explanation: ReportField<String>,
    pub timeline: Vec<TimelineEntry>,
}

/// Derives the learner's results from the session's final state.
pub fn generate_report(
    experiment_id: &str,
    experiment_name: &str,
    vessel: &VesselSnapshot,
    measurements: &MeasurementRecord,
    history: &History,
) -> ResultsReport {
    let timeline = history.timeline().collect();
    let mut report = ResultsReport {
        experiment_id: experiment_id.to_string(),
        experiment_name: experiment_name.to_string(),
        measurements: measurements.entries().to_vec(),
        measured_ph: ReportField::NoResultYet,
        theoretical_ph: ReportField::NoResultYet,
        deviation: ReportField::NoResultYet,
        regime: ReportField::NoResultYet,
        buffer_capacity: ReportField::NoResultYet,
        composition_changed_since_measurement: false,
        explanation: ReportField::NoResultYet,
        timeline,
    };

    let last_measure = history.last_measurement();
    let measured = last_measure
        .and_then(|a| a.resulting_ph)
        .or_else(|| measurements.latest().map(|e| e.ph));
    let Some(measured) = measured else {
        return report;
    };

    let estimate = equilibrium::evaluate(vessel);
    report.measured_ph = ReportField::Value(measured);
    report.buffer_capacity = ReportField::Value(BufferCapacity::classify(vessel.conjugate_pair_moles()));
    match estimate {
        Some(estimate) => {
            report.theoretical_ph = ReportField::Value(estimate.ph);
            report.deviation = ReportField::Value(estimate.ph - measured);
            report.regime = ReportField::Value(estimate.regime);
        }
        None => {
            report.theoretical_ph = ReportField::Inconclusive;
            report.deviation = ReportField::Inconclusive;
            report.regime = ReportField::Inconclusive;
        }
    }
    report.composition_changed_since_measurement = match last_measure {
        Some(action) => {
            (action.total_volume_ml - vessel.total_volume_ml).abs() > 1e-9
                || estimate.map_or(true, |e| (e.ph - measured).abs() > 1e-9)
        }
        None => true,
    };
    report.explanation = ReportField::Value(explain(&report, measured));
    report
}

fn acidity(ph: f64) -> &'static str {
    if ph < 6.5 {
        "acidic"
    } else if ph <= 7.5 {
        "close to neutral"
    } else {
        "basic"
    }
}

fn explain(report: &ResultsReport, measured: f64) -> String {
    let mut text = format!(
        "The solution measured pH {:.2} ({} on the indicator), which is {}.",
        measured,
        ColorBand::for_ph(measured),
        acidity(measured)
    );
    match (&report.theoretical_ph, &report.regime) {
        (ReportField::Value(ph), ReportField::Value(regime)) => {
            text.push_str(&format!(" The {} calculation gives pH {:.2}.", regime, ph));
        }
        _ => text.push_str(" The current contents give no definite calculated pH."),
    }
    if report.composition_changed_since_measurement {
        text.push_str(" The vessel has changed since that reading.");
    }
    if let ReportField::Value(capacity) = &report.buffer_capacity {
        match capacity {
            BufferCapacity::NoBufferFormed => text.push_str(" No buffer was formed."),
            other => text.push_str(&format!(" Buffer capacity is {}.", other)),
        }
    }
    text
}

/// Reads an action log written by `ActionLogger`.
pub fn read_action_log(log_path: &str) -> Result<Vec<LogEntry>, LabError> {
    let mut reader = csv::Reader::from_path(log_path)
        .map_err(|e| LabError::CsvError(log_path.to_string(), e))?;
    let mut entries = Vec::new();
    for result in reader.deserialize() {
        let record: LogEntry = result.map_err(|e| LabError::CsvError(log_path.to_string(), e))?;
        entries.push(record);
    }
    Ok(entries)
}

/// (total volume in mL, pH) for every measurement in the log, in order.
pub fn titration_curve(entries: &[LogEntry]) -> Vec<(f64, f64)> {
    entries
        .iter()
        .filter(|e| e.command == "measure_ph")
        .filter_map(|e| e.ph.map(|ph| (e.total_volume_ml, ph)))
        .collect()
}
