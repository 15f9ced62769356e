//! Pipeline configuration.
//!
//! [`PipelineConfig`] carries the frame geometry, output frame rate, the
//! three working directories, and progress settings. It is built once per
//! run and handed to each component at construction, so nothing in the crate
//! depends on process-wide paths. Two runs must not share directories.
//!
//! # Example
//!
//! ```
//! use vidbridge::PipelineConfig;
//!
//! let config = PipelineConfig::new()
//!     .with_dimensions(64, 48)
//!     .with_fps(24.0)
//!     .with_staging_dir("work/frames")
//!     .with_artifact_dir("work")
//!     .with_output_dir("work/videos");
//! assert!(config.validate().is_ok());
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::BridgeError,
    progress::{NoOpProgress, ProgressCallback},
    writer::VideoCodec,
};

/// Default frame width and height.
pub const DEFAULT_DIMENSION: u32 = 128;
/// Default output frame rate.
pub const DEFAULT_FPS: f64 = 30.0;
/// Default progress cadence, in frames.
pub const DEFAULT_BATCH_SIZE: u64 = 10;

/// Settings shared by the extractor, the simulator bridge and the assembler.
#[derive(Clone)]
pub struct PipelineConfig {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) fps: f64,
    pub(crate) staging_dir: PathBuf,
    pub(crate) artifact_dir: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) codec: VideoCodec,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .field("staging_dir", &self.staging_dir)
            .field("artifact_dir", &self.artifact_dir)
            .field("output_dir", &self.output_dir)
            .field("codec", &self.codec)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Defaults: 128x128 frames at 30 fps, staging in `frames`, simulator
    /// artifacts in the current directory, videos in `output_videos`,
    /// MPEG-4 output, progress every 10 frames to a no-op callback.
    pub fn new() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            fps: DEFAULT_FPS,
            staging_dir: PathBuf::from("frames"),
            artifact_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output_videos"),
            codec: VideoCodec::Mpeg4,
            progress: Arc::new(NoOpProgress),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the frame size used for extraction, decoding and output.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the frame rate of the assembled videos.
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Directory receiving `input_frame_<n>.txt` artifacts.
    #[must_use]
    pub fn with_staging_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.staging_dir = path.into();
        self
    }

    /// Directory the simulator runs in and writes `output_*` artifacts to.
    #[must_use]
    pub fn with_artifact_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.artifact_dir = path.into();
        self
    }

    /// Directory receiving the three assembled videos.
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Codec of the assembled videos.
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often progress is reported. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Frame width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Output frame rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Staging directory for input artifacts.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Simulator working directory.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Output directory for assembled videos.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output codec.
    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    /// Check that dimensions are non-zero and the frame rate is a positive,
    /// finite number.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfiguration`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::InvalidConfiguration(format!(
                "frame dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(BridgeError::InvalidConfiguration(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}
