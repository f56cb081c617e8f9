use crate::config::ExperimentLibrary;
use crate::plotting;
use anyhow::Result;
use labforge_core::{
    analysis::ResultsReport,
    simulation::{
        builder::ExperimentBuilder,
        engine::ExperimentSession,
        guided::StepPosition,
        state::{CommandOutcome, SessionEvent},
    },
};
use labforge_schemas::{command::Command, file_formats::SessionScript};
use std::path::Path;

/// Tally of a scripted run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub accepted: usize,
    pub refused: usize,
}

/// Replays a session script against its experiment and prints the report.
pub fn run_script(
    library: &ExperimentLibrary,
    script: &SessionScript,
    output_dir: &str,
    plot: bool,
) -> Result<RunSummary> {
    let definition = library.get(&script.experiment_id)?.clone();
    println!("\n--- [Session] {} ---", definition.experiment_name);

    let log_path = Path::new(output_dir).join(format!("{}_actions.csv", definition.experiment_id));
    let log_path = log_path.to_string_lossy().to_string();

    let mut builder = ExperimentBuilder::new()
        .with_definition(definition)
        .with_action_log_to_file(&log_path);
    if !script.guided {
        builder = builder.without_step_gating();
    }
    let mut session = builder.build()?;

    announce_step(&session);
    let mut summary = RunSummary::default();
    for command in &script.commands {
        match session.execute(command) {
            Ok(outcome) => {
                summary.accepted += 1;
                print_outcome(command, &outcome);
                print_events(&session);
            }
            Err(e) if e.is_recoverable() => {
                summary.refused += 1;
                println!("  [refused] {}: {}", command.name(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    print_summary_report(&session.results_report(), &session);

    if plot {
        plotting::generate_all_plots(output_dir, &log_path, session.experiment_name())?;
    }
    Ok(summary)
}

fn announce_step(session: &ExperimentSession) {
    if let Some(step) = session.current_step() {
        println!("--- Entering step {}: {} ---", step.step_id, step.title);
        if !step.description.is_empty() {
            println!("    {}", step.description);
        }
    }
}

fn print_outcome(command: &Command, outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Vessel(vessel) => println!(
            "  {:<15} -> {:.2} mL in vessel",
            command.name(),
            vessel.total_volume_ml
        ),
        CommandOutcome::Measurement(m) => println!(
            "  {:<15} -> [{}] pH {:.2} ({}, {})",
            command.name(),
            m.label,
            m.ph,
            m.color_band,
            m.regime
        ),
    }
}

fn print_events(session: &ExperimentSession) {
    for event in session.events() {
        match event {
            SessionEvent::StepCompleted { step_id } => {
                println!("  Step {} complete.", step_id);
                announce_step(session);
            }
            SessionEvent::StepReopened { step_id } => {
                println!("  Step {} reopened.", step_id);
            }
            SessionEvent::ExperimentCompleted => println!("--- Reached end of guided steps ---"),
            SessionEvent::LogWriteFailed { reason } => {
                println!("  [Warning] Action log row not written: {}", reason);
            }
            _ => {}
        }
    }
}

fn print_summary_report(report: &ResultsReport, session: &ExperimentSession) {
    println!("\n\n--- [Results Report] ---");
    println!("========================================");
    println!("Experiment: {} ({})", report.experiment_name, report.experiment_id);

    let progress = session.guided_progress();
    if progress.total_steps > 0 {
        match progress.current {
            StepPosition::Complete => println!("Guided steps: all {} complete", progress.total_steps),
            StepPosition::Step(id) => println!(
                "Guided steps: {}/{} complete, stopped at step {}",
                progress.completed_step_ids.len(),
                progress.total_steps,
                id
            ),
        }
    }

    println!("\nMeasurements:");
    if report.measurements.is_empty() {
        println!("  - none");
    }
    for entry in &report.measurements {
        println!("  - {:<20} pH {:.2}", entry.label, entry.ph);
    }

    println!("\nLast measured pH:    {:.2}", report.measured_ph);
    println!("Calculated pH:       {:.2}", report.theoretical_ph);
    println!("Deviation:           {:.3}", report.deviation);
    println!("Regime:              {}", report.regime);
    println!("Buffer capacity:     {}", report.buffer_capacity);
    println!("\n{}", report.explanation);

    println!("\nTimeline:");
    for entry in &report.timeline {
        println!("  {:>3}. {:<45} {}", entry.index, entry.description, entry.observation);
    }
    println!("========================================");
}
