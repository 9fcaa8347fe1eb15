use anyhow::Result;
use plotters::prelude::*;
use qaoa_search::sweep::{run_depth_sweep_seeded, SweepResult, NORM_TOLERANCE};

const SEED: u64 = 42;

fn plot_fidelities(result: &SweepResult, file_name: &str) -> Result<()> {
    let root = BitMapBackend::new(file_name, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_depth = result.records.len() as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption("Target fidelity vs ansatz depth", ("sans-serif", 20))
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(0.0..max_depth + 1.0, 0.0..1.05)?;

    chart.configure_mesh().draw()?;

    let points: Vec<(f64, f64)> = result
        .records
        .iter()
        .map(|r| (r.depth as f64, r.fidelity))
        .collect();

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, RED.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let target = args.get(1).map(String::as_str).unwrap_or("0101");
    let max_depth: usize = match args.get(2) {
        Some(raw) => raw.parse()?,
        None => 5,
    };
    let file_name = args.get(3).map(String::as_str).unwrap_or("fidelity.png");

    println!(
        "Searching for |{}> over {} qubits, depths 1..={}",
        target,
        target.len(),
        max_depth
    );

    let result = run_depth_sweep_seeded(target, target.len(), max_depth, SEED)?;

    for record in &result.records {
        println!(
            "p = {}, cost = {:.6}, fidelity = {:.6}",
            record.depth, record.cost, record.fidelity
        );
        if record.norm_error > NORM_TOLERANCE {
            eprintln!(
                "Warning: state norm drifted by {:.2e} at depth {}",
                record.norm_error, record.depth
            );
        }
    }

    plot_fidelities(&result, file_name)?;
    println!("Fidelity curve saved to '{}'.", file_name);

    Ok(())
}
