//! End-to-end orchestration.
//!
//! A run has three strictly sequential phases: extraction, simulation and
//! assembly. Each can be skipped independently so a run can pick up from
//! artifacts left by an earlier one. The first fatal error stops the run;
//! nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidbridge::{IcarusSimulator, Phases, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new().with_dimensions(64, 64);
//! let simulator = IcarusSimulator::new(config.artifact_dir());
//! let report = Pipeline::new(config)?
//!     .with_phases(Phases::default())
//!     .run_to_files(Some(Path::new("input.mp4")), simulator)?;
//! println!("{} frames assembled", report.frames_assembled());
//! # Ok::<(), vidbridge::BridgeError>(())
//! ```

use std::path::Path;

use crate::{
    assembler::{AssemblyReport, FrameAssembler},
    config::PipelineConfig,
    error::BridgeError,
    extractor::FrameExtractor,
    naming::{self, ArtifactKind},
    simulation::{SimulationBridge, SimulationResult, Simulator},
    writer::{SinkFactory, VideoFileSinks},
};

/// Which phases to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Phases {
    /// Reuse input artifacts already in the staging directory.
    pub skip_extraction: bool,
    /// Reuse simulator outputs already in the artifact directory.
    pub skip_simulation: bool,
    /// Stop before writing the channel videos.
    pub skip_video_creation: bool,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Frames extracted, or usable staged frames found when extraction was
    /// skipped.
    pub input_frames: u64,
    /// Whether extraction was skipped.
    pub extraction_skipped: bool,
    /// Simulation outcome, `None` when skipped.
    pub simulation: Option<SimulationResult>,
    /// Assembly outcome, `None` when skipped.
    pub assembly: Option<AssemblyReport>,
}

impl PipelineReport {
    /// Frames written to each channel video, 0 when assembly was skipped.
    pub fn frames_assembled(&self) -> u64 {
        self.assembly
            .map(|report| report.frames_assembled)
            .unwrap_or(0)
    }
}

/// Runs extraction, simulation and assembly in order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    phases: Phases,
}

impl Pipeline {
    /// Create a pipeline running every phase.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfiguration`] if the configuration
    /// fails [`PipelineConfig::validate`].
    pub fn new(config: PipelineConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self {
            config,
            phases: Phases::default(),
        })
    }

    /// Choose which phases to skip.
    #[must_use]
    pub fn with_phases(mut self, phases: Phases) -> Self {
        self.phases = phases;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run with the channel videos written into the configured output
    /// directory.
    pub fn run_to_files<S: Simulator>(
        &self,
        video: Option<&Path>,
        simulator: S,
    ) -> Result<PipelineReport, BridgeError> {
        let mut sinks = VideoFileSinks::new(self.config.output_dir(), self.config.codec());
        self.run(video, simulator, &mut sinks)
    }

    /// Run every phase not skipped.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidConfiguration`] if extraction is enabled and
    ///   `video` is `None`.
    /// - The first error raised by any phase. A failed simulation means
    ///   assembly is not attempted.
    pub fn run<S, F>(
        &self,
        video: Option<&Path>,
        simulator: S,
        sinks: &mut F,
    ) -> Result<PipelineReport, BridgeError>
    where
        S: Simulator,
        F: SinkFactory,
    {
        let input_frames = if self.phases.skip_extraction {
            log::info!("Skipping frame extraction...");
            self.count_staged_frames()?
        } else {
            let video = video.ok_or_else(|| {
                BridgeError::InvalidConfiguration(
                    "an input video is required unless extraction is skipped".to_string(),
                )
            })?;
            FrameExtractor::new(&self.config)?.extract(video)?
        };

        let simulation = if self.phases.skip_simulation {
            log::info!("Skipping simulation...");
            None
        } else {
            Some(SimulationBridge::new(simulator, &self.config).run()?)
        };

        let assembly = if self.phases.skip_video_creation {
            log::info!("Skipping output video creation...");
            None
        } else {
            Some(FrameAssembler::new(&self.config)?.assemble_into(sinks)?)
        };

        log::info!("Process complete!");
        Ok(PipelineReport {
            input_frames,
            extraction_skipped: self.phases.skip_extraction,
            simulation,
            assembly,
        })
    }

    fn count_staged_frames(&self) -> Result<u64, BridgeError> {
        let staged = naming::discover_sequence(&self.config.staging_dir, ArtifactKind::Input)?;
        let usable = staged.truncation_bound();
        if staged.has_gap() {
            log::warn!(
                "Staged input frames stop at index {usable}; {} more lie beyond the gap",
                staged.len() as u64 - usable
            );
        }
        log::info!("Found {usable} existing frames");
        Ok(usable)
    }
}
