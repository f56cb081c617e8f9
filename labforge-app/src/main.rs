use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;

mod config;
mod plotting;
mod workflow;

#[derive(Parser)]
#[command(name = "labforge", version, about = "Bench-chemistry experiment simulator")]
struct Cli {
    /// Directory holding experiment definition YAML files
    #[arg(long, global = true, default_value = "./data/experiments")]
    experiments: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// List the experiments in the library
    List,
    /// Replay a session script and print its results report
    Run {
        /// Session script YAML file
        #[arg(long)]
        script: String,
        /// Parent directory for run output
        #[arg(long, default_value = "./data/runs")]
        output: String,
        /// Draw the pH curve and vessel volume charts
        #[arg(long)]
        plot: bool,
    },
}

fn main() -> Result<()> {
    println!("--- Labforge ---");
    let cli = Cli::parse();

    let library = config::ExperimentLibrary::load(&cli.experiments)?;

    match cli.command {
        CliCommand::List => {
            for (id, def) in &library.experiments {
                let mode = if def.guided_steps.is_empty() {
                    "free play".to_string()
                } else {
                    format!("{} guided steps", def.guided_steps.len())
                };
                println!("  {:<24} {} ({} reagents, {})", id, def.experiment_name, def.reagents.len(), mode);
            }
        }
        CliCommand::Run { script, output, plot } => {
            let session_script = config::load_script(&script)?;

            let output_dir = format!(
                "{}/{}_{}",
                output,
                session_script.experiment_id,
                chrono::Utc::now().format("%Y%m%d_%H%M%S")
            );
            fs::create_dir_all(&output_dir)
                .with_context(|| format!("Failed to create output directory: {}", output_dir))?;

            // Copy the script to the output directory for traceability
            fs::copy(&script, Path::new(&output_dir).join("script.yaml"))?;

            let summary = workflow::run_script(&library, &session_script, &output_dir, plot)?;
            println!(
                "\nSession complete: {} command(s) accepted, {} refused. Results are in '{}'",
                summary.accepted, summary.refused, output_dir
            );
        }
    }

    Ok(())
}
