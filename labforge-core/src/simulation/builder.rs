use crate::{
    error::LabError,
    logger::ActionLogger,
    simulation::{
        engine::ExperimentSession,
        guided::StepMachine,
        history::History,
        reveal::RevealGate,
        state::MeasurementRecord,
        vessel::VesselState,
    },
};
use labforge_schemas::{
    experiment::{ExperimentDefinition, MeasurementMethod},
    reagent::{Reagent, ReagentRole},
    step::{GuidedStep, StepCondition},
};
use std::collections::HashMap;

pub const DEFAULT_VESSEL_CAPACITY_ML: f64 = 25.0;

/// A fluent builder for constructing an `ExperimentSession`.
///
/// An experiment is data: a reagent catalog plus an optional ordered list of
/// guided steps. The same engine runs every experiment.
pub struct ExperimentBuilder {
    experiment_id: String,
    experiment_name: String,
    reagents: Vec<Reagent>,
    guided_steps: Vec<GuidedStep>,
    vessel_capacity_ml: f64,
    measurement: MeasurementMethod,
    step_gating: bool,
    log_path: Option<String>,
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self {
            experiment_id: "experiment".to_string(),
            experiment_name: "Untitled experiment".to_string(),
            reagents: Vec::new(),
            guided_steps: Vec::new(),
            vessel_capacity_ml: DEFAULT_VESSEL_CAPACITY_ML,
            measurement: MeasurementMethod::default(),
            step_gating: true,
            log_path: None,
        }
    }
}

impl ExperimentBuilder {
    /// Creates a new, empty `ExperimentBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes identity, catalog, steps, capacity and measurement method from a
    /// loaded experiment definition.
    pub fn with_definition(self, definition: ExperimentDefinition) -> Self {
        self.with_identity(&definition.experiment_id, &definition.experiment_name)
            .with_reagents(definition.reagents)
            .with_guided_steps(definition.guided_steps)
            .with_vessel_capacity_ml(definition.vessel_capacity_ml)
            .with_measurement_method(definition.measurement)
    }

    pub fn with_identity(mut self, experiment_id: &str, experiment_name: &str) -> Self {
        self.experiment_id = experiment_id.to_string();
        self.experiment_name = experiment_name.to_string();
        self
    }

    /// Sets the reagent catalog.
    pub fn with_reagents(mut self, reagents: Vec<Reagent>) -> Self {
        self.reagents = reagents;
        self
    }

    /// Sets the ordered guided steps. Leave empty for free play.
    pub fn with_guided_steps(mut self, steps: Vec<GuidedStep>) -> Self {
        self.guided_steps = steps;
        self
    }

    pub fn with_vessel_capacity_ml(mut self, capacity_ml: f64) -> Self {
        self.vessel_capacity_ml = capacity_ml;
        self
    }

    pub fn with_measurement_method(mut self, method: MeasurementMethod) -> Self {
        self.measurement = method;
        self
    }

    /// Steps are still tracked, but out-of-order actions are not rejected.
    pub fn without_step_gating(mut self) -> Self {
        self.step_gating = false;
        self
    }

    /// Configures the session to write one CSV row per accepted command.
    pub fn with_action_log_to_file(mut self, path: &str) -> Self {
        self.log_path = Some(path.to_string());
        self
    }

    /// Consumes the builder and returns a ready `ExperimentSession`.
    ///
    /// # Errors
    ///
    /// Returns a `LabError` if the catalog is empty or inconsistent, the
    /// steps are not numbered `1..=N`, a step names an unknown reagent, or
    /// the action log cannot be created.
    pub fn build(self) -> Result<ExperimentSession, LabError> {
        if self.reagents.is_empty() {
            return Err(LabError::NoReagentsProvided);
        }
        if !(self.vessel_capacity_ml > 0.0) {
            return Err(LabError::ConfigError(format!(
                "vessel capacity must be positive, got {} mL",
                self.vessel_capacity_ml
            )));
        }

        let mut catalog = HashMap::new();
        let mut pair_pka: Option<(String, f64)> = None;
        for reagent in &self.reagents {
            validate_reagent(reagent)?;
            if reagent.role.is_conjugate_pair() {
                let pka = reagent.pka.ok_or_else(|| {
                    LabError::ConfigError(format!(
                        "reagent '{}' is a conjugate pair component but declares no pKa",
                        reagent.reagent_id
                    ))
                })?;
                match &pair_pka {
                    Some((other, other_pka)) if (other_pka - pka).abs() > 1e-9 => {
                        return Err(LabError::ConfigError(format!(
                            "pKa of '{}' ({}) does not match its pair partner '{}' ({})",
                            reagent.reagent_id, pka, other, other_pka
                        )));
                    }
                    Some(_) => {}
                    None => pair_pka = Some((reagent.reagent_id.clone(), pka)),
                }
            }
            if catalog
                .insert(reagent.reagent_id.clone(), reagent.clone())
                .is_some()
            {
                return Err(LabError::ConfigError(format!(
                    "duplicate reagent id '{}'",
                    reagent.reagent_id
                )));
            }
        }

        for (i, step) in self.guided_steps.iter().enumerate() {
            let expected = i as u32 + 1;
            if step.step_id != expected {
                return Err(LabError::ConfigError(format!(
                    "guided step '{}' has id {}, expected {}",
                    step.title, step.step_id, expected
                )));
            }
        }
        for step in &self.guided_steps {
            match step.condition {
                StepCondition::ReagentAdded { .. } if step.required_ids.is_empty() => {
                    return Err(LabError::ConfigError(format!(
                        "step {} requires a reagent but lists none",
                        step.step_id
                    )));
                }
                StepCondition::ReagentAdded { .. } | StepCondition::IndicatorPlaced => {}
                _ => continue,
            }
            for id in &step.required_ids {
                let reagent = catalog
                    .get(id)
                    .ok_or_else(|| LabError::ReagentNotFound(id.clone()))?;
                if step.condition == StepCondition::IndicatorPlaced
                    && reagent.role != ReagentRole::Indicator
                {
                    return Err(LabError::ConfigError(format!(
                        "step {} names '{}' as its indicator, but it is a {}",
                        step.step_id, id, reagent.role
                    )));
                }
            }
        }

        let logger = match self.log_path {
            Some(path) => Some(
                ActionLogger::new(&path).map_err(|e| LabError::FileIO(path.clone(), e))?,
            ),
            None => None,
        };

        Ok(ExperimentSession {
            experiment_id: self.experiment_id,
            experiment_name: self.experiment_name,
            reagent_order: self.reagents.iter().map(|r| r.reagent_id.clone()).collect(),
            catalog,
            measurement: self.measurement,
            vessel: VesselState::new(self.vessel_capacity_ml),
            history: History::new(),
            steps: StepMachine::new(self.guided_steps, self.step_gating),
            measurements: MeasurementRecord::default(),
            events: Vec::new(),
            reveal: RevealGate::default(),
            logger,
        })
    }
}

fn validate_reagent(reagent: &Reagent) -> Result<(), LabError> {
    let volumes_ok = reagent.min_volume_ml.is_finite()
        && reagent.max_volume_ml.is_finite()
        && reagent.min_volume_ml > 0.0
        && reagent.min_volume_ml <= reagent.max_volume_ml;
    if !volumes_ok {
        return Err(LabError::ConfigError(format!(
            "reagent '{}' has an invalid volume range {}..={} mL",
            reagent.reagent_id, reagent.min_volume_ml, reagent.max_volume_ml
        )));
    }
    if !(reagent.molarity >= 0.0) {
        return Err(LabError::ConfigError(format!(
            "reagent '{}' has a negative molarity",
            reagent.reagent_id
        )));
    }
    Ok(())
}
