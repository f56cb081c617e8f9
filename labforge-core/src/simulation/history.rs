use crate::{
    equilibrium::ColorBand,
    error::LabError,
    simulation::vessel::VesselState,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddReagent,
    Measure,
    PlaceIndicator,
}

/// An accepted command. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub sequence: u64,
    pub kind: ActionKind,
    pub reagent_id: Option<String>,
    pub reagent_name: Option<String>,
    pub volume_ml: Option<f64>,
    pub label: Option<String>,
    pub resulting_ph: Option<f64>,
    /// Vessel volume right after the action was applied.
    pub total_volume_ml: f64,
    /// Guided step this action completed, if any.
    pub satisfied_step: Option<u32>,
}

impl Action {
    pub fn add_reagent(reagent_id: &str, reagent_name: &str, volume_ml: f64) -> Self {
        Self {
            sequence: 0,
            kind: ActionKind::AddReagent,
            reagent_id: Some(reagent_id.to_string()),
            reagent_name: Some(reagent_name.to_string()),
            volume_ml: Some(volume_ml),
            label: None,
            resulting_ph: None,
            total_volume_ml: 0.0,
            satisfied_step: None,
        }
    }

    pub fn place_indicator() -> Self {
        Self {
            sequence: 0,
            kind: ActionKind::PlaceIndicator,
            reagent_id: None,
            reagent_name: None,
            volume_ml: None,
            label: None,
            resulting_ph: None,
            total_volume_ml: 0.0,
            satisfied_step: None,
        }
    }

    pub fn measure(label: &str, ph: f64) -> Self {
        Self {
            sequence: 0,
            kind: ActionKind::Measure,
            reagent_id: None,
            reagent_name: None,
            volume_ml: None,
            label: Some(label.to_string()),
            resulting_ph: Some(ph),
            total_volume_ml: 0.0,
            satisfied_step: None,
        }
    }

    pub fn with_total_volume(mut self, total_volume_ml: f64) -> Self {
        self.total_volume_ml = total_volume_ml;
        self
    }

    pub fn describe(&self) -> String {
        match self.kind {
            ActionKind::AddReagent => format!(
                "Added {:.2} mL of {}",
                self.volume_ml.unwrap_or(0.0),
                self.reagent_name
                    .as_deref()
                    .or(self.reagent_id.as_deref())
                    .unwrap_or("unknown reagent")
            ),
            ActionKind::PlaceIndicator => "Placed the indicator".to_string(),
            ActionKind::Measure => match &self.label {
                Some(label) => format!("Measured pH ({})", label),
                None => "Measured pH".to_string(),
            },
        }
    }

    pub fn observe(&self) -> String {
        match self.kind {
            ActionKind::AddReagent => format!("Vessel holds {:.2} mL", self.total_volume_ml),
            ActionKind::PlaceIndicator => "Indicator ready in the vessel".to_string(),
            ActionKind::Measure => match self.resulting_ph {
                Some(ph) => format!("pH {:.2}, indicator {}", ph, ColorBand::for_ph(ph)),
                None => "No reading".to_string(),
            },
        }
    }
}

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// 1-based position in the history.
    pub index: usize,
    pub description: String,
    pub observation: String,
}

/// Ordered record of accepted actions.
#[derive(Debug, Clone, Default)]
pub struct History {
    actions: Vec<Action>,
    next_sequence: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `action`, stamping it with the next sequence number.
    pub fn record(&mut self, mut action: Action) -> &Action {
        self.next_sequence += 1;
        action.sequence = self.next_sequence;
        self.actions.push(action);
        &self.actions[self.actions.len() - 1]
    }

    /// Removes the most recent action and reverses its effect on `vessel`.
    pub fn undo_last(&mut self, vessel: &mut VesselState) -> Result<Action, LabError> {
        let action = self.actions.last().ok_or(LabError::EmptyHistory)?;
        vessel.revert_last_addition(action)?;
        self.actions.pop().ok_or(LabError::EmptyHistory)
    }

    /// Drops every addition of `reagent_id`, returning what was removed.
    pub fn remove_reagent(&mut self, reagent_id: &str) -> Vec<Action> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.actions.drain(..).partition(|a| {
            a.kind == ActionKind::AddReagent && a.reagent_id.as_deref() == Some(reagent_id)
        });
        self.actions = kept;
        removed
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.next_sequence = 0;
    }

    pub fn last(&self) -> Option<&Action> {
        self.actions.last()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Most recent measurement still in the history.
    pub fn last_measurement(&self) -> Option<&Action> {
        self.actions.iter().rev().find(|a| a.kind == ActionKind::Measure)
    }

    /// True when a measurement follows the last addition. Indicator placement
    /// does not change the composition.
    pub fn has_measured_since_last_addition(&self) -> bool {
        for action in self.actions.iter().rev() {
            match action.kind {
                ActionKind::Measure => return true,
                ActionKind::AddReagent => return false,
                ActionKind::PlaceIndicator => {}
            }
        }
        false
    }

    /// Lazy view of the history as an audit trail. Call again, or clone the
    /// iterator, to restart it.
    pub fn timeline(&self) -> Timeline<'_> {
        Timeline {
            inner: self.actions.iter().enumerate(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Action>>,
}

impl<'a> Iterator for Timeline<'a> {
    type Item = TimelineEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(i, action)| TimelineEntry {
            index: i + 1,
            description: action.describe(),
            observation: action.observe(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Timeline<'_> {}
