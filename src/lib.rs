//! # vidbridge
//!
//! Move video frames to and from an external hardware simulator through a
//! per-pixel text interchange format.
//!
//! A run has three phases:
//!
//! 1. **Extraction**: [`FrameExtractor`] decodes a video with FFmpeg, resizes
//!    every frame, and writes it as `input_frame_<n>.txt`, one `R G B` line
//!    per pixel.
//! 2. **Simulation**: [`SimulationBridge`] compiles and runs the simulator
//!    (Icarus Verilog by default, see [`IcarusSimulator`]), which reads the
//!    inputs and writes `output_gray_<n>.txt`, `output_neg_<n>.txt` and
//!    `output_bin_<n>.txt`.
//! 3. **Assembly**: [`FrameAssembler`] decodes the three output sequences in
//!    numeric index order and writes one single-channel video per channel.
//!
//! [`Pipeline`] runs the phases in order and lets any of them be skipped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidbridge::{IcarusSimulator, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_dimensions(128, 128)
//!     .with_fps(30.0);
//! let simulator = IcarusSimulator::new(config.artifact_dir());
//! let report = Pipeline::new(config)?.run_to_files(Some(Path::new("input.mp4")), simulator)?;
//! println!("{} frames per channel", report.frames_assembled());
//! # Ok::<(), vidbridge::BridgeError>(())
//! ```
//!
//! ## Interchange format
//!
//! ```
//! use image::RgbImage;
//! use vidbridge::{ChannelKind, RasterFrame, codec};
//!
//! let frame = RasterFrame::Rgb(RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap());
//! let text = codec::encode_rgb_frame(&frame)?;
//! assert_eq!(text, "255 0 0\n0 0 255\n");
//! assert_eq!(codec::decode_channel_frame(&text, 2, 1, ChannelKind::Rgb)?, frame);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed for video decoding and
//! encoding. The bundled simulator driver expects `iverilog` and `vvp` on
//! `PATH`.

pub mod assembler;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod frame;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod simulation;
pub mod source;
pub mod writer;

pub use assembler::{AssemblyReport, FrameAssembler};
pub use config::PipelineConfig;
pub use error::{BridgeError, DecodeError, EncodeError, SimulationError, SimulationStep};
pub use extractor::FrameExtractor;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{ChannelKind, RasterFrame};
pub use naming::{ArtifactKind, Channel, DiscoveredSequence, discover_sequence};
pub use pipeline::{Phases, Pipeline, PipelineReport};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use simulation::{IcarusSimulator, SimulationBridge, SimulationResult, Simulator};
pub use source::VideoSource;
pub use writer::{FrameSink, SinkFactory, VideoCodec, VideoFileSinks, VideoWriter};
