//! Run extraction, the Icarus Verilog simulation and assembly end to end.
//!
//! Usage:
//!   cargo run --example run_pipeline -- <input_video> [simulation_dir]
//!
//! `simulation_dir` holds the Verilog sources and receives the simulator's
//! output artifacts. It defaults to the current directory.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vidbridge::{IcarusSimulator, Pipeline, PipelineConfig, ProgressCallback, ProgressInfo};

/// Prints one line per progress report.
struct PrintProgress;

impl ProgressCallback for PrintProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let pct = info
            .percentage
            .map_or("??".to_string(), |p| format!("{p:.1}"));
        println!(
            "[{:?}] {}/{} ({pct}%) elapsed={:.1}s",
            info.operation,
            info.current,
            info.total.map_or("?".to_string(), |t| t.to_string()),
            info.elapsed.as_secs_f64(),
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "input.mp4".to_string());
    let simulation_dir = args.next().map_or_else(|| PathBuf::from("."), PathBuf::from);

    let config = PipelineConfig::new()
        .with_artifact_dir(&simulation_dir)
        .with_progress(Arc::new(PrintProgress))
        .with_batch_size(25);
    let pipeline = Pipeline::new(config)?;

    let simulator = IcarusSimulator::new(&simulation_dir);
    let report = pipeline.run_to_files(Some(Path::new(&input_path)), simulator)?;

    println!("Staged {} frames", report.input_frames);
    if let Some(simulation) = &report.simulation {
        println!(
            "Simulation: compile {:.1}s, run {:.1}s, outputs detected: {}",
            simulation.compile_time.as_secs_f64(),
            simulation.run_time.as_secs_f64(),
            simulation.outputs_detected,
        );
    }
    println!(
        "Wrote {} frames per channel into {}",
        report.frames_assembled(),
        pipeline.config().output_dir().display()
    );
    Ok(())
}
