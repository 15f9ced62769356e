//! Progress reporting.
//!
//! Extraction and assembly report progress through a [`ProgressCallback`]
//! every `batch_size` frames (10 by default) and once more when the phase
//! ends. Reports are informational: a callback observes the pipeline but
//! cannot steer it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidbridge::{FrameExtractor, PipelineConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} frames", info.operation, info.current);
//!     }
//! }
//!
//! let config = PipelineConfig::new().with_progress(Arc::new(PrintProgress));
//! let frames = FrameExtractor::new(&config)?.extract("input.mp4")?;
//! # Ok::<(), vidbridge::BridgeError>(())
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// The phase currently reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding the source video into staged input artifacts.
    FrameExtraction,
    /// Decoding simulator outputs into the channel videos.
    FrameAssembly,
}

/// A snapshot of phase progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which phase is reporting.
    pub operation: OperationType,
    /// Frames processed so far.
    pub current: u64,
    /// Total frames expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the phase started.
    pub elapsed: Duration,
    /// Index of the frame just processed, absent in the final report.
    pub current_frame: Option<u64>,
    /// Whether this is the closing report of the phase.
    pub finished: bool,
}

/// Receives progress updates during extraction and assembly.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once at the end of a phase.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards every report. Used when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts processed frames and fires the callback at the configured cadence.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total: total.filter(|&total| total > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
        }
    }

    /// Record one completed frame.
    pub(crate) fn advance(&mut self, frame_index: u64) {
        self.current += 1;
        if self.current % self.batch_size == 0 {
            log::info!("{:?}: processed {} frames", self.operation, self.current);
            self.report(Some(frame_index), false);
        }
    }

    /// Emit the closing report.
    pub(crate) fn finish(&mut self) {
        self.report(None, true);
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    fn report(&self, current_frame: Option<u64>, finished: bool) {
        let percentage = self
            .total
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            current_frame,
            finished,
        });
    }
}
