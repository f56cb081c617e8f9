//! Charts drawn from a session's action log.

use anyhow::Result;
use labforge_core::analysis::{self, read_action_log};
use labforge_core::logger::LogEntry;
use plotters::prelude::*;

/// Generates and saves every chart for one session run.
pub fn generate_all_plots(output_dir: &str, log_path: &str, experiment_name: &str) -> Result<()> {
    println!("[Plotting] Generating graphs from the action log...");

    let entries = read_action_log(log_path)?;

    if entries.is_empty() {
        println!("[Plotting] Warning: No data to plot.");
        return Ok(());
    }

    plot_titration_curve(output_dir, &entries, experiment_name)?;
    plot_vessel_volume(output_dir, &entries)?;

    println!("[Plotting] Graphs have been saved to '{}'.", output_dir);
    Ok(())
}

/// pH against total vessel volume, one point per measurement.
fn plot_titration_curve(output_dir: &str, entries: &[LogEntry], experiment_name: &str) -> Result<()> {
    let curve = analysis::titration_curve(entries);
    if curve.is_empty() {
        println!("[Plotting] No measurements recorded, skipping the pH curve.");
        return Ok(());
    }

    let path = format!("{}/1_ph_curve.png", output_dir);
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_volume = curve.iter().map(|(v, _)| *v).fold(1.0, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("pH Curve: {}", experiment_name), ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_volume * 1.1, 0f64..14f64)?;

    chart
        .configure_mesh()
        .x_desc("Total volume (mL)")
        .y_desc("pH")
        .draw()?;

    chart
        .draw_series(DashedLineSeries::new(
            vec![(0.0, 7.0), (max_volume * 1.1, 7.0)],
            5,
            5,
            (&BLACK).into(),
        ))?
        .label("Neutral")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.filled()));

    chart
        .draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(3)))?
        .label("Measured pH")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.filled()));

    chart.draw_series(
        curve
            .iter()
            .map(|&(volume, ph)| Circle::new((volume, ph), 5, RED.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Vessel volume after every accepted command.
fn plot_vessel_volume(output_dir: &str, entries: &[LogEntry]) -> Result<()> {
    let path = format!("{}/2_vessel_volume.png", output_dir);
    let root = BitMapBackend::new(&path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_row = entries.last().map_or(1, |e| e.row);
    let max_volume = entries.iter().map(|e| e.total_volume_ml).fold(1.0, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption("Vessel Volume per Command", ("sans-serif", 50).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0u64..max_row, 0f64..max_volume * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Command")
        .y_desc("Volume (mL)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            entries.iter().map(|e| (e.row, e.total_volume_ml)),
            BLUE.stroke_width(2),
        ))?
        .label("Total volume")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));

    let reversals = entries
        .iter()
        .filter(|e| matches!(e.command.as_str(), "undo" | "reset" | "reset_reagent"))
        .map(|e| TriangleMarker::new((e.row, e.total_volume_ml), 7, MAGENTA.filled()));
    chart.draw_series(reversals)?
        .label("Undo / reset")
        .legend(|(x, y)| TriangleMarker::new((x + 10, y), 6, MAGENTA.filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
