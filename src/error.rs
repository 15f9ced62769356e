//! Error types for the `vidbridge` crate.
//!
//! [`BridgeError`] is the unified error returned by every fallible public
//! operation. The frame codec and the simulator bridge have their own
//! narrower taxonomies ([`EncodeError`], [`DecodeError`],
//! [`SimulationError`]) which `BridgeError` wraps with the context needed to
//! act on them: the artifact path, the failing step, the exit code.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::naming::Channel;

/// The unified error type for all `vidbridge` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// The input video is missing or could not be opened.
    #[error("Video source unavailable at {path}: {reason}")]
    SourceUnavailable {
        /// Path that was passed to the extractor.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A frame could not be serialised to the interchange format.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] EncodeError),

    /// An interchange artifact could not be parsed.
    #[error("Failed to decode {path}: {source}")]
    Decode {
        /// The artifact that failed to decode.
        path: PathBuf,
        /// What was wrong with it.
        #[source]
        source: DecodeError,
    },

    /// The external simulator failed to build or run.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// An artifact inside the truncation bound disappeared before it was read.
    #[error("Missing {channel} artifact for frame {index} at {path}")]
    MissingArtifact {
        /// Channel whose artifact was expected.
        channel: Channel,
        /// Frame index of the artifact.
        index: u64,
        /// Where it was expected.
        path: PathBuf,
    },

    /// A configuration value is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A video frame could not be decoded from the source.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The output encoder could not be set up or rejected a frame.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// Writing an output video failed.
    #[error("Video write error: {0}")]
    VideoWriteError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for BridgeError {
    fn from(error: FfmpegError) -> Self {
        BridgeError::FfmpegError(error.to_string())
    }
}

/// Reasons a [`RasterFrame`](crate::RasterFrame) cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Width or height is zero.
    #[error("frame has zero dimensions ({width}x{height})")]
    ZeroDimensions {
        /// Frame width.
        width: u32,
        /// Frame height.
        height: u32,
    },

    /// The frame has the wrong number of channels for the requested encoding.
    #[error("expected {expected} channel(s) per pixel, frame has {found}")]
    ChannelCount {
        /// Channels required by the encoding.
        expected: u8,
        /// Channels present in the frame.
        found: u8,
    },

    /// A binary-kind frame holds a value other than 0 or 255.
    #[error("pixel {index} has value {value}, binary frames hold only 0 or 255")]
    NotBinary {
        /// Row-major pixel index.
        index: usize,
        /// Offending value.
        value: u8,
    },
}

/// Reasons interchange text cannot be decoded into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The number of pixel lines differs from `width * height`.
    #[error("expected {expected} pixel lines, found {found}")]
    LineCountMismatch {
        /// `width * height`.
        expected: usize,
        /// Pixel lines actually present.
        found: usize,
    },

    /// A value falls outside the channel's domain.
    #[error("line {line}: value {value} is outside 0..={max}")]
    OutOfRange {
        /// 1-based line number in the text.
        line: usize,
        /// The parsed value.
        value: i64,
        /// Largest permitted value (255, or 1 for binary).
        max: u8,
    },

    /// A token is not a decimal integer.
    #[error("line {line}: '{token}' is not an integer")]
    InvalidToken {
        /// 1-based line number in the text.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A line holds the wrong number of values for the channel kind.
    #[error("line {line}: expected {expected} value(s), found {found}")]
    TokenCount {
        /// 1-based line number in the text.
        line: usize,
        /// Values per pixel for the channel kind.
        expected: usize,
        /// Values on the line.
        found: usize,
    },

    /// The caller asked for a zero-sized frame.
    #[error("cannot decode a frame with zero dimensions ({width}x{height})")]
    ZeroDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// The step of the external simulation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStep {
    /// Building the simulation executable.
    Compile,
    /// Executing the simulation.
    Run,
}

impl std::fmt::Display for SimulationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationStep::Compile => f.write_str("compile"),
            SimulationStep::Run => f.write_str("run"),
        }
    }
}

/// Failures of the external simulator.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The build step exited unsuccessfully.
    #[error("Simulation compile failed ({}): {command}", describe_exit(.code))]
    CompileFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The run step exited unsuccessfully.
    #[error("Simulation run failed ({}): {command}", describe_exit(.code))]
    RunFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The program for a step could not be started at all.
    #[error("Failed to start {step} step program '{program}': {source}")]
    Spawn {
        /// Which step was starting.
        step: SimulationStep,
        /// Program name or path.
        program: String,
        /// Underlying OS error.
        #[source]
        source: IoError,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
