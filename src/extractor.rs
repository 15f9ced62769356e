//! Frame extraction: video to staged input artifacts.
//!
//! [`FrameExtractor`] reads a video front to back, resizes every frame to the
//! configured size, converts it to RGB, encodes it with
//! [`encode_rgb_frame`](crate::codec::encode_rgb_frame) and writes it to the
//! staging directory as `input_frame_<n>.txt`, numbering from 0 without
//! gaps.
//!
//! Resampling is bilinear ([`RESAMPLING_FILTER`]) and is skipped when a
//! frame already has the target size, so same-size inputs pass through
//! pixel-exact.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{DynamicImage, imageops::FilterType};

use crate::{
    codec,
    config::PipelineConfig,
    error::BridgeError,
    frame::RasterFrame,
    naming::{self, ArtifactKind},
    progress::{OperationType, ProgressCallback, ProgressTracker},
    source::VideoSource,
};

/// Filter used to resize source frames to the target size.
pub const RESAMPLING_FILTER: FilterType = FilterType::Triangle;

/// Writes a video's frames into the staging directory.
pub struct FrameExtractor {
    width: u32,
    height: u32,
    staging_dir: PathBuf,
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
}

impl FrameExtractor {
    /// Build an extractor from the run configuration.
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
            staging_dir: config.staging_dir.clone(),
            progress: Arc::clone(&config.progress),
            batch_size: config.batch_size,
        })
    }

    /// Extract every frame of the video at `video_source`.
    ///
    /// Returns the number of input artifacts written.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::SourceUnavailable`] if the video cannot be opened.
    ///   Nothing is written in that case.
    /// - Any decode, encode or I/O error; extraction stops at the first one.
    pub fn extract<P: AsRef<Path>>(&self, video_source: P) -> Result<u64, BridgeError> {
        let source = VideoSource::open(video_source.as_ref())?;
        log::info!("Processing video: {}", source.path().display());
        log::info!(
            "Total frames: {}, FPS: {:.3}, size: {}x{}",
            source.frame_count(),
            source.frames_per_second(),
            source.width(),
            source.height(),
        );
        let total = Some(source.frame_count());
        self.write_frames(source, total)
    }

    /// Extract frames from any decoded frame sequence.
    ///
    /// This is what [`extract`](FrameExtractor::extract) runs after opening
    /// the file; it is public so callers can feed frames from another
    /// decoder.
    pub fn extract_frames<I>(&self, frames: I) -> Result<u64, BridgeError>
    where
        I: IntoIterator<Item = Result<DynamicImage, BridgeError>>,
    {
        self.write_frames(frames, None)
    }

    fn write_frames<I>(&self, frames: I, total: Option<u64>) -> Result<u64, BridgeError>
    where
        I: IntoIterator<Item = Result<DynamicImage, BridgeError>>,
    {
        if !self.staging_dir.exists() {
            fs::create_dir_all(&self.staging_dir)?;
            log::info!("Created directory: {}", self.staging_dir.display());
        }

        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::FrameExtraction,
            total,
            self.batch_size,
        );

        for (index, frame) in (0u64..).zip(frames) {
            let frame = prepare_frame(&frame?, self.width, self.height);
            let text = codec::encode_rgb_frame(&frame)?;
            let path = ArtifactKind::Input.path_in(&self.staging_dir, index);
            fs::write(&path, text)?;
            log::debug!("Wrote {}", path.display());
            tracker.advance(index);
        }
        tracker.finish();

        let written = tracker.current();
        self.warn_about_stale_artifacts(written);
        log::info!("Extracted {written} frames from video");
        Ok(written)
    }

    fn warn_about_stale_artifacts(&self, written: u64) {
        match naming::discover_sequence(&self.staging_dir, ArtifactKind::Input) {
            Ok(staged) => {
                let stale = staged.indices().iter().filter(|&&index| index >= written).count();
                if stale > 0 {
                    log::warn!(
                        "{stale} input artifacts from an earlier run remain in {} at index {written} or above",
                        self.staging_dir.display(),
                    );
                }
            }
            Err(error) => log::debug!("Could not rescan staging directory: {error}"),
        }
    }
}

/// Resize `image` to `width` x `height` with [`RESAMPLING_FILTER`] and
/// convert it to RGB.
pub fn prepare_frame(image: &DynamicImage, width: u32, height: u32) -> RasterFrame {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return RasterFrame::Rgb(rgb);
    }
    RasterFrame::Rgb(image::imageops::resize(&rgb, width, height, RESAMPLING_FILTER))
}
