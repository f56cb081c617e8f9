use crate::{command::Command, experiment::ExperimentDefinition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ExperimentFile {
    pub schema_version: String,
    pub experiments: Vec<ExperimentDefinition>,
}

/// A recorded or hand-written sequence of commands for one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionScript {
    pub schema_version: String,
    pub experiment_id: String,
    /// Set to false to run a guided experiment without step gating.
    #[serde(default = "default_guided")]
    pub guided: bool,
    pub commands: Vec<Command>,
}

fn default_guided() -> bool {
    true
}
