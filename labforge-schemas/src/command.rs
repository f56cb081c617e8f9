use serde::{Deserialize, Serialize};

/// A structured learner command, as issued by the presentation layer or a
/// session script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    AddReagent {
        reagent_id: String,
        volume_ml: f64,
    },
    PlaceIndicator,
    MeasurePh {
        #[serde(default)]
        label: Option<String>,
    },
    Undo,
    Reset,
    /// Clears one reagent's contribution and keeps measurement records.
    ResetReagent {
        reagent_id: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddReagent { .. } => "add_reagent",
            Command::PlaceIndicator => "place_indicator",
            Command::MeasurePh { .. } => "measure_ph",
            Command::Undo => "undo",
            Command::Reset => "reset",
            Command::ResetReagent { .. } => "reset_reagent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_commands_deserialize_from_yaml() {
        let yaml = r#"
- type: add_reagent
  reagent_id: HCL-0.1M
  volume_ml: 10.0
- type: place_indicator
- type: measure_ph
  label: "0.1 M"
- type: measure_ph
- type: undo
- type: reset_reagent
  reagent_id: HCL-0.1M
- type: reset
"#;
        let commands: Vec<Command> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(commands.len(), 7);
        assert_eq!(
            commands[0],
            Command::AddReagent { reagent_id: "HCL-0.1M".to_string(), volume_ml: 10.0 }
        );
        assert_eq!(commands[2], Command::MeasurePh { label: Some("0.1 M".to_string()) });
        assert_eq!(commands[3], Command::MeasurePh { label: None });
        assert_eq!(commands[6].name(), "reset");
    }
}
