use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("{volume_ml} mL of '{reagent_id}' is outside the allowed range {min_ml}..={max_ml} mL")]
    OutOfRange {
        reagent_id: String,
        volume_ml: f64,
        min_ml: f64,
        max_ml: f64,
    },

    #[error("'{action}' does not belong to step {step_id} ({title})")]
    StepMismatch {
        step_id: u32,
        title: String,
        action: String,
    },

    #[error("There is nothing to undo")]
    EmptyHistory,

    #[error("Measurement is inconclusive: {0}")]
    Inconclusive(String),

    #[error("Reagent '{0}' is not part of this experiment")]
    ReagentNotFound(String),

    #[error("The pending results reveal was cancelled")]
    RevealCancelled,

    #[error("At least one reagent must be provided for the experiment")]
    NoReagentsProvided,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}

impl LabError {
    /// Learner-facing errors: the command was refused, nothing changed, and
    /// the session can carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LabError::OutOfRange { .. }
                | LabError::StepMismatch { .. }
                | LabError::EmptyHistory
                | LabError::Inconclusive(_)
                | LabError::ReagentNotFound(_)
                | LabError::RevealCancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_recoverable() {
        assert!(LabError::EmptyHistory.is_recoverable());
        assert!(LabError::Inconclusive("no solution".into()).is_recoverable());
        assert!(!LabError::ConfigError("bad".into()).is_recoverable());
        assert!(!LabError::NoReagentsProvided.is_recoverable());
    }

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = LabError::OutOfRange {
            reagent_id: "HCL-0.1M".into(),
            volume_ml: 12.0,
            min_ml: 1.0,
            max_ml: 10.0,
        };
        assert_eq!(
            err.to_string(),
            "12 mL of 'HCL-0.1M' is outside the allowed range 1..=10 mL"
        );
    }
}
