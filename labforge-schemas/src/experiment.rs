use crate::{reagent::Reagent, step::GuidedStep};
use serde::{Deserialize, Serialize};

/// How pH is read in an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementMethod {
    /// Reading requires an indicator in the vessel.
    #[default]
    Indicator,
    PhMeter,
}

/// Everything needed to instantiate one experiment: its reagent catalog and
/// its guided step list. An empty step list means free play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExperimentDefinition {
    pub experiment_id: String,
    pub experiment_name: String,
    #[serde(default)]
    pub notes: String,
    pub vessel_capacity_ml: f64,
    #[serde(default)]
    pub measurement: MeasurementMethod,
    pub reagents: Vec<Reagent>,
    #[serde(default)]
    pub guided_steps: Vec<GuidedStep>,
}
