//! Simulator bridge tests.
//!
//! Most tests use a recording fake. The subprocess tests rely on the POSIX
//! `true` and `false` utilities and only run on Unix.

mod common;

use std::fs;

use common::RecordingSimulator;
use tempfile::TempDir;
use vidbridge::{
    IcarusSimulator, PipelineConfig, SimulationBridge, SimulationError, SimulationStep,
};

fn config_for(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new().with_artifact_dir(dir.path())
}

// ── Sequencing ─────────────────────────────────────────────────────

#[test]
fn compile_runs_before_run() {
    let dir = TempDir::new().expect("tempdir");
    let mut simulator = RecordingSimulator::default();

    SimulationBridge::new(&mut simulator, &config_for(&dir))
        .run()
        .expect("simulate");

    assert_eq!(
        simulator.calls,
        vec![SimulationStep::Compile, SimulationStep::Run]
    );
}

#[test]
fn failed_compile_skips_run() {
    let dir = TempDir::new().expect("tempdir");
    let mut simulator = RecordingSimulator {
        fail_compile: true,
        ..RecordingSimulator::default()
    };

    let result = SimulationBridge::new(&mut simulator, &config_for(&dir)).run();

    assert!(matches!(
        result,
        Err(SimulationError::CompileFailed { code: Some(2), .. })
    ));
    assert_eq!(simulator.calls, vec![SimulationStep::Compile]);
}

#[test]
fn failed_run_is_reported_once() {
    let dir = TempDir::new().expect("tempdir");
    let mut simulator = RecordingSimulator {
        fail_run: true,
        ..RecordingSimulator::default()
    };

    let result = SimulationBridge::new(&mut simulator, &config_for(&dir)).run();

    assert!(matches!(result, Err(SimulationError::RunFailed { .. })));
    assert_eq!(
        simulator.calls,
        vec![SimulationStep::Compile, SimulationStep::Run]
    );
}

#[test]
fn bridge_hands_back_its_simulator() {
    let dir = TempDir::new().expect("tempdir");
    let mut bridge = SimulationBridge::new(RecordingSimulator::default(), &config_for(&dir));
    assert!(bridge.simulator().calls.is_empty());

    bridge.run().expect("simulate");
    assert_eq!(bridge.simulator().calls.len(), 2);

    let simulator = bridge.into_inner();
    assert_eq!(
        simulator.calls,
        vec![SimulationStep::Compile, SimulationStep::Run]
    );
}

// ── Post-run check ─────────────────────────────────────────────────

#[test]
fn missing_first_output_is_only_a_warning() {
    let dir = TempDir::new().expect("tempdir");

    let result = SimulationBridge::new(RecordingSimulator::default(), &config_for(&dir))
        .run()
        .expect("a missing first output does not fail the run");

    assert!(!result.outputs_detected);
}

#[test]
fn first_gray_output_is_detected() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("output_gray_0.txt"), "0\n").expect("write");

    let result = SimulationBridge::new(RecordingSimulator::default(), &config_for(&dir))
        .run()
        .expect("simulate");

    assert!(result.outputs_detected);
}

#[test]
fn later_outputs_alone_are_not_detected() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("output_gray_1.txt"), "0\n").expect("write");
    fs::write(dir.path().join("output_neg_0.txt"), "0\n").expect("write");

    let result = SimulationBridge::new(RecordingSimulator::default(), &config_for(&dir))
        .run()
        .expect("simulate");

    assert!(!result.outputs_detected);
}

// ── Icarus commands ────────────────────────────────────────────────

#[test]
fn icarus_commands_follow_the_handoff_contract() {
    let simulator = IcarusSimulator::new("hw");

    let compile = simulator.compile_command();
    assert_eq!(compile.get_program(), "iverilog");
    let args: Vec<_> = compile
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        args,
        [
            "-o",
            "video_processor_tb",
            "grayscale.v",
            "threshold.v",
            "inverter.v",
            "image_processor.v",
            "tb_video_processor.v",
        ]
    );
    assert_eq!(compile.get_current_dir(), Some(simulator.working_dir()));

    let run = simulator.run_command();
    assert_eq!(run.get_program(), "vvp");
    assert_eq!(run.get_args().collect::<Vec<_>>(), ["video_processor_tb"]);
}

#[test]
fn icarus_commands_are_configurable() {
    let simulator = IcarusSimulator::new(".")
        .with_compiler("iverilog-12")
        .with_runtime("vvp-12")
        .with_sources(["top.v"])
        .with_testbench("tb.v")
        .with_executable("sim");

    let compile = simulator.compile_command();
    assert_eq!(compile.get_program(), "iverilog-12");
    assert_eq!(
        compile.get_args().collect::<Vec<_>>(),
        ["-o", "sim", "top.v", "tb.v"]
    );
    let run = simulator.run_command();
    assert_eq!(run.get_program(), "vvp-12");
    assert_eq!(run.get_args().collect::<Vec<_>>(), ["sim"]);
}

#[test]
fn missing_program_is_a_spawn_error() {
    let dir = TempDir::new().expect("tempdir");
    let simulator =
        IcarusSimulator::new(dir.path()).with_compiler("vidbridge-no-such-compiler");

    let error = SimulationBridge::new(simulator, &config_for(&dir))
        .run()
        .expect_err("compiler does not exist");

    match error {
        SimulationError::Spawn { step, program, .. } => {
            assert_eq!(step, SimulationStep::Compile);
            assert_eq!(program, "vidbridge-no-such-compiler");
        }
        other => panic!("expected Spawn, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn nonzero_compile_exit_is_compile_failed() {
    let dir = TempDir::new().expect("tempdir");
    let simulator = IcarusSimulator::new(dir.path())
        .with_compiler("false")
        .with_runtime("vidbridge-never-started");

    let error = SimulationBridge::new(simulator, &config_for(&dir))
        .run()
        .expect_err("compiler exits 1");

    match &error {
        SimulationError::CompileFailed { command, code } => {
            assert_eq!(*code, Some(1));
            assert!(command.starts_with("false -o video_processor_tb"));
        }
        other => panic!("expected CompileFailed, got {other:?}"),
    }
    assert!(error.to_string().contains("exit code 1"));
}

#[cfg(unix)]
#[test]
fn nonzero_run_exit_is_run_failed() {
    let dir = TempDir::new().expect("tempdir");
    let simulator = IcarusSimulator::new(dir.path())
        .with_compiler("true")
        .with_runtime("false");

    let error = SimulationBridge::new(simulator, &config_for(&dir))
        .run()
        .expect_err("runtime exits 1");

    assert!(matches!(
        error,
        SimulationError::RunFailed { code: Some(1), .. }
    ));
}

#[cfg(unix)]
#[test]
fn successful_subprocesses_complete_the_bridge() {
    let dir = TempDir::new().expect("tempdir");
    let simulator = IcarusSimulator::new(dir.path())
        .with_compiler("true")
        .with_runtime("true");

    let result = SimulationBridge::new(simulator, &config_for(&dir))
        .run()
        .expect("both steps succeed");

    assert!(!result.outputs_detected);
}
