use super::{
    guided::{Attempt, GuidedProgress, StepMachine},
    history::{Action, History, Timeline},
    reveal::{RevealGate, RevealToken},
    state::{CommandOutcome, Measurement, MeasurementRecord, SessionEvent},
    vessel::{VesselSnapshot, VesselState},
};
use crate::{
    analysis::{self, ResultsReport},
    equilibrium::{self, ColorBand},
    error::LabError,
    logger::ActionLogger,
};
use labforge_schemas::{
    command::Command,
    experiment::MeasurementMethod,
    reagent::Reagent,
    step::{GuidedStep, StepCondition},
};
use std::{collections::HashMap, time::Duration};

/// One learner's run of one experiment. Owns the vessel, the history, the
/// guided progress and the measurement record; every command runs to
/// completion before the next one.
pub struct ExperimentSession {
    pub(super) experiment_id: String,
    pub(super) experiment_name: String,
    pub(super) catalog: HashMap<String, Reagent>,
    pub(super) reagent_order: Vec<String>,
    pub(super) measurement: MeasurementMethod,
    pub(super) vessel: VesselState,
    pub(super) history: History,
    pub(super) steps: StepMachine,
    pub(super) measurements: MeasurementRecord,
    pub(super) events: Vec<SessionEvent>,
    pub(super) reveal: RevealGate,
    pub(super) logger: Option<ActionLogger>,
}

impl ExperimentSession {
    /// Applies any structured command.
    pub fn execute(&mut self, command: &Command) -> Result<CommandOutcome, LabError> {
        match command {
            Command::AddReagent {
                reagent_id,
                volume_ml,
            } => self.add_reagent(reagent_id, *volume_ml).map(CommandOutcome::Vessel),
            Command::PlaceIndicator => self.place_indicator().map(CommandOutcome::Vessel),
            Command::MeasurePh { label } => self
                .measure_ph(label.as_deref())
                .map(CommandOutcome::Measurement),
            Command::Undo => self.undo().map(CommandOutcome::Vessel),
            Command::Reset => self.reset().map(CommandOutcome::Vessel),
            Command::ResetReagent { reagent_id } => {
                self.reset_reagent(reagent_id).map(CommandOutcome::Vessel)
            }
        }
    }

    pub fn add_reagent(&mut self, reagent_id: &str, volume_ml: f64) -> Result<VesselSnapshot, LabError> {
        self.events.clear();
        let reagent = self
            .catalog
            .get(reagent_id)
            .ok_or_else(|| LabError::ReagentNotFound(reagent_id.to_string()))?;
        self.steps.check(Attempt::AddReagent(reagent))?;

        let snapshot = self.vessel.apply_addition(reagent, volume_ml)?;
        let action = Action::add_reagent(&reagent.reagent_id, &reagent.display_name, volume_ml)
            .with_total_volume(snapshot.total_volume_ml);
        self.events.push(SessionEvent::ReagentAdded {
            reagent_id: reagent_id.to_string(),
            volume_ml,
        });
        self.accept(action, &snapshot);
        self.log("add_reagent", None, &snapshot);
        Ok(snapshot)
    }

    /// Placing the indicator twice is a no-op the second time, unless the
    /// current step is still waiting for a placement.
    pub fn place_indicator(&mut self) -> Result<VesselSnapshot, LabError> {
        self.events.clear();
        let awaited = matches!(
            self.steps.current_step().map(|s| &s.condition),
            Some(StepCondition::IndicatorPlaced)
        );
        if self.vessel.has_indicator() && !awaited {
            return Ok(self.vessel.snapshot());
        }
        self.steps.check(Attempt::PlaceIndicator)?;

        let snapshot = self.vessel.apply_indicator_placement();
        let action = Action::place_indicator().with_total_volume(snapshot.total_volume_ml);
        self.events.push(SessionEvent::IndicatorPlaced);
        self.accept(action, &snapshot);
        self.log("place_indicator", None, &snapshot);
        Ok(snapshot)
    }

    /// Reads the pH of the vessel. Never invents a value: an empty vessel, a
    /// missing indicator or an ambiguous composition are all `Inconclusive`.
    pub fn measure_ph(&mut self, label: Option<&str>) -> Result<Measurement, LabError> {
        self.events.clear();
        self.steps.check(Attempt::Measure)?;

        let snapshot = self.vessel.snapshot();
        if snapshot.is_empty() {
            return Err(LabError::Inconclusive("the vessel holds no solution".to_string()));
        }
        if self.measurement == MeasurementMethod::Indicator && !snapshot.has_indicator {
            return Err(LabError::Inconclusive("no indicator in the vessel".to_string()));
        }
        let estimate = equilibrium::evaluate(&snapshot).ok_or_else(|| {
            LabError::Inconclusive("the composition gives no definite pH".to_string())
        })?;

        let label = match label {
            Some(label) => label.to_string(),
            None => self.measurements.next_sample_label(),
        };
        let color_band = ColorBand::for_ph(estimate.ph);
        self.measurements.record(&label, estimate.ph);
        self.events.push(SessionEvent::PhMeasured {
            label: label.clone(),
            ph: estimate.ph,
            color_band,
        });

        let action = Action::measure(&label, estimate.ph).with_total_volume(snapshot.total_volume_ml);
        self.accept(action, &snapshot);
        if !self.steps.is_guided() {
            self.events.push(SessionEvent::ResultsReady);
        }
        self.log("measure_ph", None, &snapshot);

        Ok(Measurement {
            label,
            ph: estimate.ph,
            color_band,
            regime: estimate.regime,
        })
    }

    /// Reverses the most recent action. Measurement records stay visible.
    pub fn undo(&mut self) -> Result<VesselSnapshot, LabError> {
        self.events.clear();
        let action = self.history.undo_last(&mut self.vessel)?;
        self.events.push(SessionEvent::ActionUndone {
            sequence: action.sequence,
        });
        if let Some(step_id) = action.satisfied_step {
            if self.steps.reopen(step_id) {
                self.events.push(SessionEvent::StepReopened { step_id });
            }
        }
        let snapshot = self.vessel.snapshot();
        self.log("undo", action.reagent_id.as_deref(), &snapshot);
        Ok(snapshot)
    }

    /// Clears vessel, history, guided progress and measurement records, and
    /// cancels any pending reveal. Calling it twice changes nothing further.
    pub fn reset(&mut self) -> Result<VesselSnapshot, LabError> {
        self.events.clear();
        let snapshot = self.vessel.reset();
        self.history.clear();
        self.steps.reset();
        self.measurements.clear();
        self.reveal.invalidate();
        self.events.push(SessionEvent::SessionReset);
        self.log("reset", None, &snapshot);
        Ok(snapshot)
    }

    /// Removes one reagent's additions from the vessel and the history.
    /// Steps those additions completed are reopened; measurement records are
    /// kept.
    pub fn reset_reagent(&mut self, reagent_id: &str) -> Result<VesselSnapshot, LabError> {
        self.events.clear();
        if !self.catalog.contains_key(reagent_id) {
            return Err(LabError::ReagentNotFound(reagent_id.to_string()));
        }
        self.vessel.remove_reagent(reagent_id);
        for action in self.history.remove_reagent(reagent_id) {
            if let Some(step_id) = action.satisfied_step {
                if self.steps.reopen(step_id) {
                    self.events.push(SessionEvent::StepReopened { step_id });
                }
            }
        }
        self.events.push(SessionEvent::ReagentCleared {
            reagent_id: reagent_id.to_string(),
        });
        let snapshot = self.vessel.snapshot();
        self.log("reset_reagent", Some(reagent_id), &snapshot);
        Ok(snapshot)
    }

    fn accept(&mut self, mut action: Action, snapshot: &VesselSnapshot) {
        let was_complete = self.steps.progress().is_complete();
        if let Some(step_id) = self.steps.on_accepted(&action, snapshot) {
            action.satisfied_step = Some(step_id);
            self.events.push(SessionEvent::StepCompleted { step_id });
            if !was_complete && self.steps.progress().is_complete() {
                self.events.push(SessionEvent::ExperimentCompleted);
                self.events.push(SessionEvent::ResultsReady);
            }
        }
        self.history.record(action);
    }

    /// Writes the log row for a command that has already been applied. A
    /// failed write cannot take the command back, so it surfaces as an event.
    fn log(&mut self, command: &str, reagent_id: Option<&str>, snapshot: &VesselSnapshot) {
        let Some(logger) = &mut self.logger else {
            return;
        };
        let action = match command {
            "undo" | "reset" | "reset_reagent" => None,
            _ => self.history.last(),
        };
        let current_step = self.steps.current_step().map(|s| s.step_id);
        if let Err(e) = logger.log_command(command, reagent_id, action, snapshot, current_step, &self.events) {
            self.events.push(SessionEvent::LogWriteFailed {
                reason: format!("{:#}", e),
            });
        }
    }

    /// Arms a deferred results reveal. The caller owns the timer.
    pub fn arm_reveal(&mut self, delay: Duration) -> RevealToken {
        self.reveal.arm(delay)
    }

    pub fn cancel_reveal(&mut self) -> bool {
        self.reveal.cancel()
    }

    /// Redeems a reveal token for the current report, unless a reset or a
    /// cancel made it stale.
    pub fn fire_reveal(&mut self, token: &RevealToken) -> Result<ResultsReport, LabError> {
        self.reveal.claim(token)?;
        Ok(self.results_report())
    }

    pub fn results_report(&self) -> ResultsReport {
        analysis::generate_report(
            &self.experiment_id,
            &self.experiment_name,
            &self.vessel.snapshot(),
            &self.measurements,
            &self.history,
        )
    }

    pub fn guided_progress(&self) -> GuidedProgress {
        self.steps.progress()
    }

    pub fn current_step(&self) -> Option<&GuidedStep> {
        self.steps.current_step()
    }

    pub fn has_measured_since_last_addition(&self) -> bool {
        self.history.has_measured_since_last_addition()
    }

    /// Whether the presentation layer should draw attention to the measure
    /// control. Derived on every call.
    pub fn should_prompt_measurement(&self) -> bool {
        if self.vessel.total_volume_ml() <= 0.0 || self.has_measured_since_last_addition() {
            return false;
        }
        match self.steps.current_step() {
            Some(step) => matches!(
                step.condition,
                StepCondition::PhMeasured | StepCondition::PhCompared { .. }
            ),
            None => true,
        }
    }

    pub fn vessel(&self) -> VesselSnapshot {
        self.vessel.snapshot()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn timeline(&self) -> Timeline<'_> {
        self.history.timeline()
    }

    pub fn measurements(&self) -> &MeasurementRecord {
        &self.measurements
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Reagents in catalog order.
    pub fn reagents(&self) -> impl Iterator<Item = &Reagent> {
        self.reagent_order.iter().filter_map(|id| self.catalog.get(id))
    }

    pub fn reagent(&self, reagent_id: &str) -> Option<&Reagent> {
        self.catalog.get(reagent_id)
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn measurement_method(&self) -> MeasurementMethod {
        self.measurement
    }
}
