use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    LessThan,
    GreaterThan,
    EqualTo,
    NotEqualTo,
}

impl ComparisonOperator {
    /// `EqualTo` and `NotEqualTo` compare to two decimal places, the
    /// resolution a bench pH reading is reported at.
    pub fn compare(self, current_value: f64, value: f64) -> bool {
        match self {
            ComparisonOperator::LessThan => current_value < value,
            ComparisonOperator::GreaterThan => current_value > value,
            ComparisonOperator::EqualTo => (current_value - value).abs() < 0.005,
            ComparisonOperator::NotEqualTo => (current_value - value).abs() >= 0.005,
        }
    }
}

/// What has to happen for a guided step to count as done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepCondition {
    /// One of the step's required reagents was added. When
    /// `min_total_volume_ml` is set, the cumulative volume of that reagent in
    /// the vessel has to reach it.
    ReagentAdded {
        #[serde(default)]
        min_total_volume_ml: Option<f64>,
    },
    /// An indicator was placed, either as equipment or as a required
    /// indicator reagent.
    IndicatorPlaced,
    /// Any successful pH measurement.
    PhMeasured,
    /// A successful pH measurement whose value satisfies the comparison.
    PhCompared {
        operator: ComparisonOperator,
        value: f64,
    },
}

/// One ordered stage of a scripted experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GuidedStep {
    pub step_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_ids: BTreeSet<String>,
    pub condition: StepCondition,
}
