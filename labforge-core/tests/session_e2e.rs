use labforge_core::{
    analysis::{BufferCapacity, ReportField},
    equilibrium::{ColorBand, Regime},
    error::LabError,
    simulation::{
        builder::ExperimentBuilder,
        engine::ExperimentSession,
        guided::StepPosition,
        state::{CommandOutcome, SessionEvent},
        vessel::VesselAppearance,
    },
};
use labforge_schemas::{
    command::Command,
    experiment::MeasurementMethod,
    reagent::{Reagent, ReagentRole},
    step::{ComparisonOperator, GuidedStep, StepCondition},
};
use std::time::Duration;

fn reagent(id: &str, name: &str, molarity: f64, role: ReagentRole, pka: Option<f64>) -> Reagent {
    Reagent {
        reagent_id: id.to_string(),
        display_name: name.to_string(),
        molarity,
        role,
        min_volume_ml: 1.0,
        max_volume_ml: 15.0,
        pka,
    }
}

fn step(step_id: u32, title: &str, required: &[&str], condition: StepCondition) -> GuidedStep {
    GuidedStep {
        step_id,
        title: title.to_string(),
        description: String::new(),
        required_ids: required.iter().map(|s| s.to_string()).collect(),
        condition,
    }
}

fn ethanoic_buffer() -> ExperimentSession {
    ExperimentBuilder::new()
        .with_identity("ethanoic-buffer", "Ethanoic acid / sodium ethanoate buffer")
        .with_reagents(vec![
            reagent("HAC", "Ethanoic acid 0.1 M", 0.1, ReagentRole::WeakAcidComponent, Some(4.76)),
            reagent("NAAC", "Sodium ethanoate 0.1 M", 0.1, ReagentRole::ConjugateBaseComponent, Some(4.76)),
            reagent("HCL", "Hydrochloric acid 0.1 M", 0.1, ReagentRole::StrongAcid, None),
        ])
        .with_guided_steps(vec![
            step(1, "Add ethanoic acid", &["HAC"], StepCondition::ReagentAdded { min_total_volume_ml: Some(5.0) }),
            step(2, "Add sodium ethanoate", &["NAAC"], StepCondition::ReagentAdded { min_total_volume_ml: Some(10.0) }),
            step(3, "Place universal indicator", &[], StepCondition::IndicatorPlaced),
            step(4, "Measure the buffer pH", &[], StepCondition::PhCompared { operator: ComparisonOperator::GreaterThan, value: 4.0 }),
        ])
        .with_vessel_capacity_ml(25.0)
        .build()
        .unwrap()
}

fn hcl_free_play() -> ExperimentSession {
    ExperimentBuilder::new()
        .with_identity("hcl-ph", "pH of hydrochloric acid")
        .with_reagents(vec![
            reagent("HCL", "Hydrochloric acid 0.1 M", 0.1, ReagentRole::StrongAcid, None),
            reagent("NAOH", "Sodium hydroxide 0.1 M", 0.1, ReagentRole::StrongBase, None),
        ])
        .with_measurement_method(MeasurementMethod::PhMeter)
        .build()
        .unwrap()
}

#[test]
fn guided_buffer_run_reaches_complete_and_reports() {
    let mut session = ethanoic_buffer();
    assert_eq!(session.guided_progress().current, StepPosition::Step(1));

    session.add_reagent("HAC", 5.0).unwrap();
    assert_eq!(session.events(), &[
        SessionEvent::ReagentAdded { reagent_id: "HAC".into(), volume_ml: 5.0 },
        SessionEvent::StepCompleted { step_id: 1 },
    ]);

    session.add_reagent("NAAC", 10.0).unwrap();
    session.place_indicator().unwrap();
    assert!(session.should_prompt_measurement());

    let measurement = session.measure_ph(Some("buffer")).unwrap();
    assert!((measurement.ph - 5.06).abs() < 0.005);
    assert_eq!(measurement.color_band, ColorBand::Yellow);
    assert_eq!(measurement.regime, Regime::Buffer);
    assert!(session.events().contains(&SessionEvent::ExperimentCompleted));
    assert!(session.events().contains(&SessionEvent::ResultsReady));
    assert!(!session.should_prompt_measurement());

    let progress = session.guided_progress();
    assert!(progress.is_complete());
    assert_eq!(progress.completed_step_ids.len(), 4);

    let report = session.results_report();
    assert_eq!(report.measured_ph, report.theoretical_ph);
    assert_eq!(report.deviation, ReportField::Value(0.0));
    assert_eq!(report.buffer_capacity, ReportField::Value(BufferCapacity::Moderate));
    assert_eq!(report.timeline.len(), 4);
    assert_eq!(report.timeline[0].description, "Added 5.00 mL of Ethanoic acid 0.1 M");
    assert_eq!(report.measurements.len(), 1);
}

#[test]
fn step_gating_rejects_without_side_effects() {
    let mut session = ethanoic_buffer();
    let vessel_before = session.vessel();

    let err = session.add_reagent("NAAC", 10.0).unwrap_err();
    assert!(matches!(err, LabError::StepMismatch { step_id: 1, .. }));
    assert!(err.is_recoverable());
    assert!(session.measure_ph(None).is_err());
    assert!(session.place_indicator().is_err());

    assert_eq!(session.vessel(), vessel_before);
    assert!(session.history().is_empty());
    assert!(session.measurements().is_empty());
    assert_eq!(session.guided_progress().current, StepPosition::Step(1));
}

#[test]
fn undo_reopens_the_step_it_completed() {
    let mut session = ethanoic_buffer();
    session.add_reagent("HAC", 5.0).unwrap();
    session.add_reagent("NAAC", 10.0).unwrap();
    assert_eq!(session.guided_progress().current, StepPosition::Step(3));

    session.undo().unwrap();
    assert!(session.events().contains(&SessionEvent::StepReopened { step_id: 2 }));
    assert_eq!(session.guided_progress().current, StepPosition::Step(2));
    assert_eq!(session.vessel().total_volume_ml, 5.0);
}

#[test]
fn strong_acid_reads_ph_one_on_a_meter() {
    let mut session = hcl_free_play();
    let snapshot = session.add_reagent("HCL", 10.0).unwrap();
    assert_eq!(snapshot.total_volume_ml, 10.0);
    assert_eq!(snapshot.appearance, VesselAppearance::Clear);

    let measurement = session.measure_ph(Some("0.1 M")).unwrap();
    assert!((measurement.ph - 1.0).abs() < 1e-9);
    assert_eq!(session.events().last(), Some(&SessionEvent::ResultsReady));
}

#[test]
fn measuring_empty_vessel_is_inconclusive() {
    let mut session = hcl_free_play();
    let err = session.measure_ph(None).unwrap_err();
    assert!(matches!(err, LabError::Inconclusive(_)));
    assert!(session.history().is_empty());
    assert!(session.results_report().measured_ph.is_no_result());
}

#[test]
fn indicator_experiments_need_an_indicator_to_read() {
    let mut session = ExperimentBuilder::new()
        .with_reagents(vec![reagent("HCL", "HCl", 0.1, ReagentRole::StrongAcid, None)])
        .build()
        .unwrap();
    session.add_reagent("HCL", 10.0).unwrap();
    assert!(matches!(session.measure_ph(None), Err(LabError::Inconclusive(_))));
    session.place_indicator().unwrap();
    assert_eq!(session.measure_ph(None).unwrap().label, "sample 1");
}

#[test]
fn default_label_never_overwrites_a_chosen_one() {
    let mut session = hcl_free_play();
    session.add_reagent("HCL", 10.0).unwrap();
    session.measure_ph(Some("sample 2")).unwrap();
    session.add_reagent("NAOH", 5.0).unwrap();

    let auto = session.measure_ph(None).unwrap();
    assert_eq!(auto.label, "sample 3");
    assert_eq!(session.measurements().len(), 2);
    let first = session.measurements().get("sample 2").unwrap();
    assert!((first - 1.0).abs() < 1e-9);
}

#[test]
fn placement_completes_indicator_step_when_indicator_reagent_already_in() {
    let mut session = ExperimentBuilder::new()
        .with_reagents(vec![
            reagent("HCL", "HCl", 0.1, ReagentRole::StrongAcid, None),
            reagent("UNIVERSAL", "Universal indicator", 0.0, ReagentRole::Indicator, None),
        ])
        .with_guided_steps(vec![
            step(1, "Add acid", &["HCL"], StepCondition::ReagentAdded { min_total_volume_ml: None }),
            step(2, "Place the indicator", &[], StepCondition::IndicatorPlaced),
            step(3, "Measure", &[], StepCondition::PhMeasured),
        ])
        .without_step_gating()
        .build()
        .unwrap();

    session.add_reagent("UNIVERSAL", 1.0).unwrap();
    session.add_reagent("HCL", 10.0).unwrap();
    assert_eq!(session.guided_progress().current, StepPosition::Step(2));

    session.place_indicator().unwrap();
    assert!(session.events().contains(&SessionEvent::StepCompleted { step_id: 2 }));
    assert_eq!(session.guided_progress().current, StepPosition::Step(3));

    // Step 2 is done, so a second placement changes nothing.
    let history_len = session.history().len();
    session.place_indicator().unwrap();
    assert_eq!(session.history().len(), history_len);
}

#[test]
fn named_indicator_step_wants_that_reagent() {
    let mut session = ExperimentBuilder::new()
        .with_reagents(vec![
            reagent("NH4CL", "Ammonium chloride", 0.1, ReagentRole::WeakAcidComponent, Some(9.25)),
            reagent("UNIVERSAL", "Universal indicator", 0.0, ReagentRole::Indicator, None),
        ])
        .with_guided_steps(vec![
            step(1, "Add a few drops of indicator", &["UNIVERSAL"], StepCondition::IndicatorPlaced),
        ])
        .build()
        .unwrap();

    assert!(matches!(session.place_indicator(), Err(LabError::StepMismatch { step_id: 1, .. })));
    assert!(!session.vessel().has_indicator);
    session.add_reagent("UNIVERSAL", 1.0).unwrap();
    assert!(session.guided_progress().is_complete());
}

#[test]
fn builder_rejects_non_indicator_named_by_indicator_step() {
    let err = ExperimentBuilder::new()
        .with_reagents(vec![reagent("HCL", "HCl", 0.1, ReagentRole::StrongAcid, None)])
        .with_guided_steps(vec![step(1, "Add indicator", &["HCL"], StepCondition::IndicatorPlaced)])
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, LabError::ConfigError(_)));
}

#[test]
fn out_of_range_volume_is_rejected() {
    let mut session = hcl_free_play();
    let err = session.add_reagent("HCL", 0.5).unwrap_err();
    assert!(matches!(err, LabError::OutOfRange { .. }));
    assert!(session.history().is_empty());
    assert!(matches!(session.add_reagent("KOH", 5.0), Err(LabError::ReagentNotFound(_))));
}

#[test]
fn undo_on_fresh_session_reports_empty_history() {
    let mut session = hcl_free_play();
    assert!(matches!(session.undo(), Err(LabError::EmptyHistory)));
}

#[test]
fn measurement_records_survive_undo_and_reagent_reset() {
    let mut session = hcl_free_play();
    session.add_reagent("HCL", 10.0).unwrap();
    session.measure_ph(Some("acid")).unwrap();
    session.undo().unwrap();
    let recorded = session.measurements().get("acid").unwrap();
    assert!((recorded - 1.0).abs() < 1e-9);

    session.reset_reagent("HCL").unwrap();
    assert_eq!(session.vessel().total_volume_ml, 0.0);
    assert!(session.history().is_empty());
    assert_eq!(session.measurements().len(), 1);

    let report = session.results_report();
    assert_eq!(report.measured_ph, ReportField::Value(recorded));
    assert_eq!(report.theoretical_ph, ReportField::Inconclusive);
    assert!(report.composition_changed_since_measurement);

    session.reset().unwrap();
    assert!(session.measurements().is_empty());
}

#[test]
fn reset_reagent_reopens_steps_and_keeps_others() {
    let mut session = ethanoic_buffer();
    session.add_reagent("HAC", 5.0).unwrap();
    session.add_reagent("NAAC", 10.0).unwrap();
    session.reset_reagent("HAC").unwrap();

    let progress = session.guided_progress();
    assert_eq!(progress.current, StepPosition::Step(1));
    assert!(progress.completed_step_ids.contains(&2));
    assert_eq!(session.vessel().volume_of("NAAC"), 10.0);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn titration_past_equivalence_turns_basic() {
    let mut session = hcl_free_play();
    session.add_reagent("HCL", 10.0).unwrap();
    session.add_reagent("NAOH", 10.0).unwrap();
    let neutral = session.measure_ph(None).unwrap();
    assert_eq!(neutral.regime, Regime::Neutralized);
    assert_eq!(neutral.ph, 7.0);

    session.add_reagent("NAOH", 5.0).unwrap();
    let basic = session.measure_ph(None).unwrap();
    assert_eq!(basic.regime, Regime::StrongBase);
    assert!(basic.ph > 11.0);
}

#[test]
fn reset_cancels_pending_reveal() {
    let mut session = hcl_free_play();
    session.add_reagent("HCL", 10.0).unwrap();
    session.measure_ph(None).unwrap();

    let token = session.arm_reveal(Duration::from_secs(2));
    session.reset().unwrap();
    assert!(matches!(session.fire_reveal(&token), Err(LabError::RevealCancelled)));

    session.add_reagent("HCL", 10.0).unwrap();
    session.measure_ph(None).unwrap();
    let token = session.arm_reveal(Duration::from_secs(2));
    let report = session.fire_reveal(&token).unwrap();
    let measured = report.measured_ph.value().copied().unwrap();
    assert!((measured - 1.0).abs() < 1e-9);
}

#[test]
fn reset_twice_is_idempotent() {
    let mut session = ethanoic_buffer();
    session.add_reagent("HAC", 5.0).unwrap();
    let once = session.reset().unwrap();
    let twice = session.reset().unwrap();
    assert_eq!(once, twice);
    assert_eq!(session.guided_progress().current, StepPosition::Step(1));
    assert!(session.history().is_empty());
}

#[test]
fn execute_dispatches_script_commands() {
    let mut session = hcl_free_play();
    let commands = vec![
        Command::AddReagent { reagent_id: "HCL".into(), volume_ml: 10.0 },
        Command::MeasurePh { label: Some("acid".into()) },
    ];
    let outcomes: Vec<_> = commands.iter().map(|c| session.execute(c).unwrap()).collect();
    assert!(matches!(outcomes[0], CommandOutcome::Vessel(_)));
    match &outcomes[1] {
        CommandOutcome::Measurement(m) => assert_eq!(m.label, "acid"),
        other => panic!("expected a measurement, got {:?}", other),
    }
}

#[test]
fn builder_rejects_mismatched_pair_pka() {
    let err = ExperimentBuilder::new()
        .with_reagents(vec![
            reagent("HAC", "HAc", 0.1, ReagentRole::WeakAcidComponent, Some(4.76)),
            reagent("NH3", "NH3", 0.1, ReagentRole::ConjugateBaseComponent, Some(9.25)),
        ])
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, LabError::ConfigError(_)));
}

#[test]
fn builder_rejects_misnumbered_steps() {
    let err = ExperimentBuilder::new()
        .with_reagents(vec![reagent("HCL", "HCl", 0.1, ReagentRole::StrongAcid, None)])
        .with_guided_steps(vec![step(2, "Add acid", &["HCL"], StepCondition::ReagentAdded { min_total_volume_ml: None })])
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, LabError::ConfigError(_)));

    assert!(matches!(
        ExperimentBuilder::new().build().err(),
        Some(LabError::NoReagentsProvided)
    ));
}
