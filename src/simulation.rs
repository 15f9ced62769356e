//! The external hardware simulator.
//!
//! The simulator is an opaque collaborator: it consumes the staged
//! `input_frame_<n>.txt` artifacts and writes `output_gray_<n>.txt`,
//! `output_neg_<n>.txt` and `output_bin_<n>.txt` into its working directory.
//! This crate only drives it through the [`Simulator`] trait (a build step,
//! then a run step) and never inspects what it does in between.
//!
//! [`IcarusSimulator`] is the subprocess implementation: it compiles a fixed,
//! ordered list of Verilog sources plus a test bench with `iverilog`, then
//! executes the result with `vvp`. [`SimulationBridge`] sequences the two
//! steps and performs the post-run check.
//!
//! # Example
//!
//! ```no_run
//! use vidbridge::{IcarusSimulator, PipelineConfig, SimulationBridge};
//!
//! let config = PipelineConfig::new().with_artifact_dir("hw");
//! let simulator = IcarusSimulator::new(config.artifact_dir());
//! let result = SimulationBridge::new(simulator, &config).run()?;
//! println!("outputs detected: {}", result.outputs_detected);
//! # Ok::<(), vidbridge::SimulationError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::{Duration, Instant},
};

use crate::{
    config::PipelineConfig,
    error::{SimulationError, SimulationStep},
    naming::{ArtifactKind, Channel},
};

/// Hardware-description sources compiled into the simulation, in order.
pub const DEFAULT_SOURCES: [&str; 4] = [
    "grayscale.v",
    "threshold.v",
    "inverter.v",
    "image_processor.v",
];
/// Test bench compiled after the sources.
pub const DEFAULT_TESTBENCH: &str = "tb_video_processor.v";
/// Name of the compiled simulation executable.
pub const DEFAULT_EXECUTABLE: &str = "video_processor_tb";

/// A two-step external simulation.
///
/// Each step blocks until the underlying work is complete. Implementations
/// report a non-successful step as [`SimulationError::CompileFailed`] or
/// [`SimulationError::RunFailed`].
pub trait Simulator {
    /// Build the simulation.
    fn compile(&mut self) -> Result<(), SimulationError>;

    /// Execute the simulation built by [`compile`](Simulator::compile).
    fn run(&mut self) -> Result<(), SimulationError>;
}

impl<S: Simulator + ?Sized> Simulator for &mut S {
    fn compile(&mut self) -> Result<(), SimulationError> {
        (**self).compile()
    }

    fn run(&mut self) -> Result<(), SimulationError> {
        (**self).run()
    }
}

/// Icarus Verilog driven as two subprocesses.
///
/// Compile: `<compiler> -o <executable> <sources...> <testbench>`.
/// Run: `<runtime> <executable>`. Both run inside the working directory,
/// inherit stdio, and have no timeout.
#[derive(Debug, Clone)]
pub struct IcarusSimulator {
    compiler: String,
    runtime: String,
    sources: Vec<PathBuf>,
    testbench: PathBuf,
    executable: PathBuf,
    working_dir: PathBuf,
}

impl IcarusSimulator {
    /// Use `iverilog`/`vvp` and the default sources inside `working_dir`.
    pub fn new<P: Into<PathBuf>>(working_dir: P) -> Self {
        Self {
            compiler: "iverilog".to_string(),
            runtime: "vvp".to_string(),
            sources: DEFAULT_SOURCES.iter().map(PathBuf::from).collect(),
            testbench: PathBuf::from(DEFAULT_TESTBENCH),
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            working_dir: working_dir.into(),
        }
    }

    /// Program used for the build step.
    #[must_use]
    pub fn with_compiler<S: Into<String>>(mut self, program: S) -> Self {
        self.compiler = program.into();
        self
    }

    /// Program used for the run step.
    #[must_use]
    pub fn with_runtime<S: Into<String>>(mut self, program: S) -> Self {
        self.runtime = program.into();
        self
    }

    /// Replace the ordered source list.
    #[must_use]
    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the test bench.
    #[must_use]
    pub fn with_testbench<P: Into<PathBuf>>(mut self, testbench: P) -> Self {
        self.testbench = testbench.into();
        self
    }

    /// Replace the executable name.
    #[must_use]
    pub fn with_executable<P: Into<PathBuf>>(mut self, executable: P) -> Self {
        self.executable = executable.into();
        self
    }

    /// Directory both steps run in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The build command, not yet started.
    pub fn compile_command(&self) -> Command {
        let mut command = Command::new(&self.compiler);
        command
            .arg("-o")
            .arg(&self.executable)
            .args(&self.sources)
            .arg(&self.testbench)
            .current_dir(&self.working_dir);
        command
    }

    /// The run command, not yet started.
    pub fn run_command(&self) -> Command {
        let mut command = Command::new(&self.runtime);
        command.arg(&self.executable).current_dir(&self.working_dir);
        command
    }
}

impl Simulator for IcarusSimulator {
    fn compile(&mut self) -> Result<(), SimulationError> {
        execute(SimulationStep::Compile, self.compile_command())
    }

    fn run(&mut self) -> Result<(), SimulationError> {
        execute(SimulationStep::Run, self.run_command())
    }
}

fn execute(step: SimulationStep, mut command: Command) -> Result<(), SimulationError> {
    let rendered = render_command(&command);
    log::info!("Running {step} step: {rendered}");

    let status = command.status().map_err(|source| SimulationError::Spawn {
        step,
        program: command.get_program().to_string_lossy().into_owned(),
        source,
    })?;

    if status.success() {
        return Ok(());
    }
    let code = status.code();
    Err(match step {
        SimulationStep::Compile => SimulationError::CompileFailed {
            command: rendered,
            code,
        },
        SimulationStep::Run => SimulationError::RunFailed {
            command: rendered,
            code,
        },
    })
}

fn render_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of a successful simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    /// Whether `output_gray_0.txt` existed after the run.
    ///
    /// This is a weak check: it cannot tell a zero-frame run from a crash
    /// before the first frame, and says nothing about later frames.
    pub outputs_detected: bool,
    /// Time spent in the build step.
    pub compile_time: Duration,
    /// Time spent in the run step.
    pub run_time: Duration,
}

/// Sequences a [`Simulator`] and checks for its first output artifact.
pub struct SimulationBridge<S> {
    simulator: S,
    artifact_dir: PathBuf,
}

impl<S: Simulator> SimulationBridge<S> {
    /// Drive `simulator`, looking for outputs in the configured artifact
    /// directory.
    pub fn new(simulator: S, config: &PipelineConfig) -> Self {
        Self {
            simulator,
            artifact_dir: config.artifact_dir.clone(),
        }
    }

    /// Compile, then run, then check for `output_gray_0.txt`.
    ///
    /// A missing first artifact is logged as a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns the first step's error unchanged. A failed build means the
    /// run step is never attempted. Nothing is retried.
    pub fn run(&mut self) -> Result<SimulationResult, SimulationError> {
        log::info!("Running hardware simulation...");

        let started = Instant::now();
        self.simulator.compile()?;
        let compile_time = started.elapsed();
        log::info!("Simulation compile successful");

        let started = Instant::now();
        self.simulator.run()?;
        let run_time = started.elapsed();
        log::info!("Simulation completed successfully");

        let first_artifact = ArtifactKind::Output(Channel::Gray).path_in(&self.artifact_dir, 0);
        let outputs_detected = first_artifact.exists();
        if outputs_detected {
            log::info!("Simulation outputs detected");
        } else {
            log::warn!(
                "No output files found after simulation (expected {})",
                first_artifact.display()
            );
        }

        Ok(SimulationResult {
            outputs_detected,
            compile_time,
            run_time,
        })
    }

    /// The wrapped simulator.
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Unwrap the simulator.
    pub fn into_inner(self) -> S {
        self.simulator
    }
}
