use crate::{
    error::LabError,
    simulation::{
        history::{Action, ActionKind},
        vessel::VesselSnapshot,
    },
};
use labforge_schemas::{
    reagent::{Reagent, ReagentRole},
    step::{GuidedStep, StepCondition},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "step_id", rename_all = "snake_case")]
pub enum StepPosition {
    Step(u32),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedProgress {
    pub current: StepPosition,
    pub completed_step_ids: BTreeSet<u32>,
    pub total_steps: usize,
}

impl GuidedProgress {
    pub fn is_complete(&self) -> bool {
        self.current == StepPosition::Complete
    }
}

/// An action the session is about to apply, as seen by the step gate.
#[derive(Debug, Clone, Copy)]
pub enum Attempt<'a> {
    AddReagent(&'a Reagent),
    PlaceIndicator,
    Measure,
}

impl Attempt<'_> {
    pub fn describe(&self) -> String {
        match self {
            Attempt::AddReagent(r) => format!("add {}", r.display_name),
            Attempt::PlaceIndicator => "place indicator".to_string(),
            Attempt::Measure => "measure pH".to_string(),
        }
    }
}

/// Tracks progress through a fixed, ordered list of steps with ids `1..=N`.
/// The current step is always the lowest id not yet completed.
#[derive(Debug, Clone)]
pub struct StepMachine {
    steps: Vec<GuidedStep>,
    completed: BTreeSet<u32>,
    gating: bool,
}

impl StepMachine {
    /// `steps` must already be sorted with ids `1..=N`; the builder checks this.
    pub fn new(steps: Vec<GuidedStep>, gating: bool) -> Self {
        Self {
            steps,
            completed: BTreeSet::new(),
            gating,
        }
    }

    pub fn steps(&self) -> &[GuidedStep] {
        &self.steps
    }

    pub fn is_guided(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn current_step(&self) -> Option<&GuidedStep> {
        self.steps.iter().find(|s| !self.completed.contains(&s.step_id))
    }

    pub fn progress(&self) -> GuidedProgress {
        GuidedProgress {
            current: self
                .current_step()
                .map_or(StepPosition::Complete, |s| StepPosition::Step(s.step_id)),
            completed_step_ids: self.completed.clone(),
            total_steps: self.steps.len(),
        }
    }

    /// Rejects an attempt that does not belong to the current step. Free play,
    /// disabled gating and a finished sequence admit everything.
    pub fn check(&self, attempt: Attempt<'_>) -> Result<(), LabError> {
        if !self.gating {
            return Ok(());
        }
        match self.current_step() {
            Some(step) if !admits(step, attempt) => Err(LabError::StepMismatch {
                step_id: step.step_id,
                title: step.title.clone(),
                action: attempt.describe(),
            }),
            _ => Ok(()),
        }
    }

    /// Completes the current step if the freshly applied `action` satisfies it.
    pub fn on_accepted(&mut self, action: &Action, vessel: &VesselSnapshot) -> Option<u32> {
        let step = self.current_step()?;
        if !is_satisfied(step, action, vessel) {
            return None;
        }
        let step_id = step.step_id;
        self.completed.insert(step_id);
        Some(step_id)
    }

    /// Reopens a step after the action that completed it was undone.
    pub fn reopen(&mut self, step_id: u32) -> bool {
        self.completed.remove(&step_id)
    }

    pub fn reset(&mut self) {
        self.completed.clear();
    }
}

fn requires(step: &GuidedStep, reagent: &Reagent) -> bool {
    step.required_ids.is_empty() || step.required_ids.contains(&reagent.reagent_id)
}

/// An indicator step that names its indicator reagents wants one of those
/// added; a bare placement only satisfies a step that names none.
fn admits(step: &GuidedStep, attempt: Attempt<'_>) -> bool {
    match (&step.condition, attempt) {
        (StepCondition::ReagentAdded { .. }, Attempt::AddReagent(reagent)) => {
            step.required_ids.contains(&reagent.reagent_id)
        }
        (StepCondition::IndicatorPlaced, Attempt::PlaceIndicator) => step.required_ids.is_empty(),
        (StepCondition::IndicatorPlaced, Attempt::AddReagent(reagent)) => {
            reagent.role == ReagentRole::Indicator && requires(step, reagent)
        }
        (StepCondition::PhMeasured | StepCondition::PhCompared { .. }, Attempt::Measure) => true,
        _ => false,
    }
}

fn is_satisfied(step: &GuidedStep, action: &Action, vessel: &VesselSnapshot) -> bool {
    match &step.condition {
        StepCondition::ReagentAdded { min_total_volume_ml } => {
            let Some(reagent_id) = action.reagent_id.as_deref() else {
                return false;
            };
            action.kind == ActionKind::AddReagent
                && step.required_ids.contains(reagent_id)
                && min_total_volume_ml.map_or(true, |min| vessel.volume_of(reagent_id) >= min - 1e-9)
        }
        StepCondition::IndicatorPlaced => vessel.has_indicator,
        StepCondition::PhMeasured => {
            action.kind == ActionKind::Measure && action.resulting_ph.is_some()
        }
        StepCondition::PhCompared { operator, value } => {
            action.kind == ActionKind::Measure
                && action.resulting_ph.map_or(false, |ph| operator.compare(ph, *value))
        }
    }
}
