//! FFmpeg initialisation and log level.
//!
//! FFmpeg prints its own diagnostics to stderr, independently of the `log`
//! facade used by the rest of the crate. [`set_ffmpeg_log_level`] tunes that
//! output; Rust-side messages are configured through whatever `log` backend
//! the application installs.

use ffmpeg_next::util::log::Level;

use crate::error::BridgeError;

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set what FFmpeg itself prints to stderr.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Initialise FFmpeg. Safe to call repeatedly.
pub(crate) fn init() -> Result<(), BridgeError> {
    ffmpeg_next::init()
        .map_err(|error| BridgeError::FfmpegError(format!("initialisation failed: {error}")))
}
