//! Frame assembly: simulator outputs to channel videos.
//!
//! [`FrameAssembler`] finds the `output_gray_<n>.txt` artifacts in the
//! simulator's working directory and uses them as the reference sequence for
//! all three channels. The number of frames assembled is the length of the
//! contiguous run of gray indices starting at 0: if gray frame 5 is missing,
//! every channel stops after frame 4, even when negative or binary frames
//! exist beyond it. Coupling the channels this way keeps the three videos the
//! same length.
//!
//! Indices are ordered numerically (`0, 2, 10`), never by file name.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::Arc,
};

use crate::{
    codec,
    config::PipelineConfig,
    error::BridgeError,
    frame::RasterFrame,
    naming::{self, ArtifactKind, Channel},
    progress::{OperationType, ProgressCallback, ProgressTracker},
    writer::{FrameSink, SinkFactory, VideoCodec, VideoFileSinks},
};

/// Summary of an assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Gray artifacts found on disk, gaps included.
    pub discovered: usize,
    /// Frames written to each of the three channel streams.
    pub frames_assembled: u64,
    /// First missing gray index when the discovered sequence has a gap.
    pub gap_at: Option<u64>,
}

impl AssemblyReport {
    fn empty(discovered: usize, gap_at: Option<u64>) -> Self {
        Self {
            discovered,
            frames_assembled: 0,
            gap_at,
        }
    }
}

/// Decodes simulator outputs and writes the three channel streams.
pub struct FrameAssembler {
    width: u32,
    height: u32,
    fps: f64,
    artifact_dir: PathBuf,
    output_dir: PathBuf,
    codec: VideoCodec,
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
}

impl FrameAssembler {
    /// Build an assembler from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfiguration`] if the configuration
    /// fails [`PipelineConfig::validate`].
    pub fn new(config: &PipelineConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self {
            width: config.width,
            height: config.height,
            fps: config.fps,
            artifact_dir: config.artifact_dir.clone(),
            output_dir: config.output_dir.clone(),
            codec: config.codec,
            progress: Arc::clone(&config.progress),
            batch_size: config.batch_size,
        })
    }

    /// Assemble into `gray_output.mp4`, `negative_output.mp4` and
    /// `binary_output.mp4` inside the configured output directory.
    ///
    /// See [`assemble_into`](FrameAssembler::assemble_into) for semantics.
    pub fn assemble(&self) -> Result<AssemblyReport, BridgeError> {
        let mut sinks = VideoFileSinks::new(self.output_dir.clone(), self.codec);
        let report = self.assemble_into(&mut sinks)?;
        if report.frames_assembled > 0 {
            log::info!("Successfully created videos in {}", self.output_dir.display());
        }
        Ok(report)
    }

    /// Assemble into sinks opened from `factory`.
    ///
    /// When no gray artifact exists (or gray frame 0 is missing) nothing is
    /// opened and an empty report is returned. Otherwise one sink per
    /// channel is opened, frames `0..bound` are decoded and written, and
    /// every sink is finished on every exit path.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::MissingArtifact`] if an artifact inside the bound
    ///   cannot be found at read time. Frames written before it are kept.
    /// - [`BridgeError::Decode`] if an artifact is malformed.
    /// - Any error from opening, writing or finishing a sink.
    pub fn assemble_into<F: SinkFactory>(
        &self,
        factory: &mut F,
    ) -> Result<AssemblyReport, BridgeError> {
        let discovered =
            naming::discover_sequence(&self.artifact_dir, ArtifactKind::Output(Channel::Gray))?;

        if discovered.is_empty() {
            log::warn!("No processed frames found in {}", self.artifact_dir.display());
            return Ok(AssemblyReport::empty(0, None));
        }

        let bound = discovered.truncation_bound();
        let gap_at = discovered.has_gap().then_some(bound);
        if let Some(missing) = gap_at {
            log::warn!(
                "Frame {missing} not found, assembling {bound} of {} discovered frames",
                discovered.len()
            );
        }
        if bound == 0 {
            return Ok(AssemblyReport::empty(discovered.len(), gap_at));
        }

        log::info!("Creating videos from {bound} frames");

        let mut sinks: Vec<(Channel, F::Sink)> = Vec::with_capacity(Channel::ALL.len());
        for channel in Channel::ALL {
            match factory.open(channel, self.width, self.height, self.fps) {
                Ok(sink) => sinks.push((channel, sink)),
                Err(error) => {
                    let _ = finish_all(&mut sinks);
                    return Err(error);
                }
            }
        }

        let written = self.write_frames(&mut sinks, bound);
        let finished = finish_all(&mut sinks);

        let frames_assembled = written?;
        finished?;
        Ok(AssemblyReport {
            discovered: discovered.len(),
            frames_assembled,
            gap_at,
        })
    }

    fn write_frames<S: FrameSink>(
        &self,
        sinks: &mut [(Channel, S)],
        bound: u64,
    ) -> Result<u64, BridgeError> {
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::FrameAssembly,
            Some(bound),
            self.batch_size,
        );

        for index in 0..bound {
            // Decode all three before writing any, so the streams stay aligned.
            let frames = sinks
                .iter()
                .map(|(channel, _)| self.read_artifact(*channel, index))
                .collect::<Result<Vec<_>, _>>()?;

            for ((_, sink), frame) in sinks.iter_mut().zip(&frames) {
                sink.write_frame(frame)?;
            }
            tracker.advance(index);
        }
        tracker.finish();
        Ok(tracker.current())
    }

    fn read_artifact(&self, channel: Channel, index: u64) -> Result<RasterFrame, BridgeError> {
        let path = ArtifactKind::Output(channel).path_in(&self.artifact_dir, index);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                log::error!("Frame {index} {channel} artifact vanished: {}", path.display());
                return Err(BridgeError::MissingArtifact {
                    channel,
                    index,
                    path,
                });
            }
            Err(error) => return Err(error.into()),
        };

        codec::decode_channel_frame(&text, self.width, self.height, channel.kind())
            .map_err(|source| BridgeError::Decode { path, source })
    }
}

/// Finish every sink, returning the first failure.
fn finish_all<S: FrameSink>(sinks: &mut [(Channel, S)]) -> Result<(), BridgeError> {
    let mut first_error = None;
    for (channel, sink) in sinks.iter_mut() {
        if let Err(error) = sink.finish() {
            log::warn!("Failed to finish {channel} stream: {error}");
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}
