//! Output video streams.
//!
//! The assembler writes each channel through a [`FrameSink`] obtained from a
//! [`SinkFactory`]. The production factory, [`VideoFileSinks`], opens one
//! FFmpeg-backed [`VideoWriter`] per channel in the output directory; tests
//! substitute in-memory sinks.
//!
//! # Example
//!
//! ```no_run
//! use image::GrayImage;
//! use vidbridge::{FrameSink, RasterFrame, VideoCodec, VideoWriter};
//!
//! let mut writer = VideoWriter::create("gray.mp4", 128, 128, 30.0, VideoCodec::Mpeg4)?;
//! writer.write_frame(&RasterFrame::Luma(GrayImage::new(128, 128)))?;
//! writer.finish()?;
//! # Ok::<(), vidbridge::BridgeError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext, encoder::video::Encoder as OpenedEncoder},
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{error::BridgeError, frame::RasterFrame, naming::Channel};

/// Largest time-base denominator accepted by every supported encoder.
const MAX_TIME_BASE_DENOMINATOR: i32 = 65_535;

/// Destination for one channel's decoded frames.
pub trait FrameSink {
    /// Append one frame.
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<(), BridgeError>;

    /// Flush and close the stream. Calling it again is a no-op.
    fn finish(&mut self) -> Result<(), BridgeError>;
}

/// Opens one sink per channel at the start of assembly.
pub trait SinkFactory {
    /// The sink type produced.
    type Sink: FrameSink;

    /// Open the stream for `channel` with the run's geometry and frame rate.
    fn open(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        fps: f64,
    ) -> Result<Self::Sink, BridgeError>;
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
    /// MPEG-4 Part 2 (`mp4v`). The default.
    #[default]
    Mpeg4,
}

impl VideoCodec {
    fn to_codec_id(self) -> Id {
        match self {
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
            VideoCodec::Mpeg4 => Id::MPEG4,
        }
    }
}

/// Streams single-channel frames into a video file.
///
/// The container is inferred from the file extension. Frames are converted
/// from GRAY8 to YUV420P before encoding. If the writer is dropped without
/// [`finish`](FrameSink::finish), it finishes itself and logs any failure.
pub struct VideoWriter {
    output: Output,
    encoder: OpenedEncoder,
    scaler: ScalingContext,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    next_pts: i64,
    width: u32,
    height: u32,
    frames_written: u64,
    finished: bool,
    path: PathBuf,
}

impl VideoWriter {
    /// Create `path` and write the container header.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidConfiguration`] for zero dimensions or a
    ///   non-positive frame rate.
    /// - [`BridgeError::VideoEncodeError`] if the codec is unavailable or
    ///   cannot be opened.
    /// - [`BridgeError::VideoWriteError`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u32,
        height: u32,
        fps: f64,
        codec: VideoCodec,
    ) -> Result<Self, BridgeError> {
        let path = path.as_ref().to_path_buf();
        if width == 0 || height == 0 {
            return Err(BridgeError::InvalidConfiguration(format!(
                "cannot write {width}x{height} video"
            )));
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(BridgeError::InvalidConfiguration(format!(
                "cannot write video at {fps} fps"
            )));
        }

        crate::ffmpeg::init()?;
        log::debug!(
            "Creating {} ({width}x{height}, {fps} fps, {codec:?})",
            path.display()
        );

        let frame_rate = Rational::from(unsafe {
            ffmpeg_sys_next::av_d2q(fps, MAX_TIME_BASE_DENOMINATOR)
        });
        let encoder_time_base = frame_rate.invert();
        let target_pixel = Pixel::YUV420P;

        let mut output = ffmpeg_next::format::output(&path).map_err(|error| {
            BridgeError::VideoWriteError(format!("cannot open {}: {error}", path.display()))
        })?;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let codec_id = codec.to_codec_id();
        let encoder_codec = ffmpeg_next::encoder::find(codec_id).ok_or_else(|| {
            BridgeError::VideoEncodeError(format!("codec {codec_id:?} not available"))
        })?;

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|error| BridgeError::VideoWriteError(format!("cannot add stream: {error}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|error| {
                BridgeError::VideoEncodeError(format!("cannot create video encoder: {error}"))
            })?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(target_pixel);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(frame_rate));

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |=
                    ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let encoder = encoder.open_as(encoder_codec).map_err(|error| {
            BridgeError::VideoEncodeError(format!("cannot open encoder: {error}"))
        })?;
        stream.set_parameters(&encoder);

        output
            .write_header()
            .map_err(|error| BridgeError::VideoWriteError(format!("cannot write header: {error}")))?;

        // The muxer may replace the stream time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| BridgeError::VideoWriteError("output stream vanished".to_string()))?;

        let scaler = ScalingContext::get(
            Pixel::GRAY8,
            width,
            height,
            target_pixel,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| BridgeError::VideoWriteError(format!("cannot create scaler: {error}")))?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            next_pts: 0,
            width,
            height,
            frames_written: 0,
            finished: false,
            path,
        })
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn drain_packets(&mut self) -> Result<(), BridgeError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output).map_err(|error| {
                BridgeError::VideoWriteError(format!("write packet failed: {error}"))
            })?;
        }
        Ok(())
    }
}

impl FrameSink for VideoWriter {
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<(), BridgeError> {
        if self.finished {
            return Err(BridgeError::VideoWriteError(format!(
                "{} is already finished",
                self.path.display()
            )));
        }
        let RasterFrame::Luma(image) = frame else {
            return Err(BridgeError::VideoWriteError(
                "output videos take single-channel frames".to_string(),
            ));
        };
        if image.dimensions() != (self.width, self.height) {
            return Err(BridgeError::VideoWriteError(format!(
                "frame is {}x{}, stream is {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            )));
        }

        let mut source_frame = VideoFrame::new(Pixel::GRAY8, self.width, self.height);
        let stride = source_frame.stride(0);
        let row_length = self.width as usize;
        let source_data = source_frame.data_mut(0);
        for (row, pixels) in image.as_raw().chunks_exact(row_length).enumerate() {
            let start = row * stride;
            source_data[start..start + row_length].copy_from_slice(pixels);
        }

        let mut scaled_frame = VideoFrame::empty();
        self.scaler
            .run(&source_frame, &mut scaled_frame)
            .map_err(|error| BridgeError::VideoWriteError(format!("scaling failed: {error}")))?;

        scaled_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&scaled_frame).map_err(|error| {
            BridgeError::VideoEncodeError(format!("send_frame failed: {error}"))
        })?;
        self.drain_packets()?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BridgeError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.encoder
            .send_eof()
            .map_err(|error| BridgeError::VideoEncodeError(format!("send_eof failed: {error}")))?;
        self.drain_packets()?;
        self.output.write_trailer().map_err(|error| {
            BridgeError::VideoWriteError(format!("cannot write trailer: {error}"))
        })?;

        log::debug!(
            "Finished {} ({} frames)",
            self.path.display(),
            self.frames_written
        );
        Ok(())
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Err(error) = self.finish() {
            log::warn!("Failed to finish {}: {error}", self.path.display());
        }
    }
}

/// Opens a [`VideoWriter`] per channel in one output directory, creating the
/// directory on first use.
#[derive(Debug, Clone)]
pub struct VideoFileSinks {
    output_dir: PathBuf,
    codec: VideoCodec,
}

impl VideoFileSinks {
    /// Write channel videos into `output_dir` with `codec`.
    pub fn new<P: Into<PathBuf>>(output_dir: P, codec: VideoCodec) -> Self {
        Self {
            output_dir: output_dir.into(),
            codec,
        }
    }

    /// Where the video for `channel` is written.
    pub fn path_for(&self, channel: Channel) -> PathBuf {
        self.output_dir.join(channel.video_file_name())
    }
}

impl SinkFactory for VideoFileSinks {
    type Sink = VideoWriter;

    fn open(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        fps: f64,
    ) -> Result<VideoWriter, BridgeError> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)?;
            log::info!("Created directory: {}", self.output_dir.display());
        }
        VideoWriter::create(self.path_for(channel), width, height, fps, self.codec)
    }
}
