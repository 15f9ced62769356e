//! Video decoding.
//!
//! [`VideoSource`] opens a media file with FFmpeg and yields every frame of
//! its best video stream, in presentation order, as an RGB8
//! [`DynamicImage`] at the stream's native size. Resizing is left to the
//! caller so the resampling policy lives in one place (see
//! [`FrameExtractor`](crate::FrameExtractor)).

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::BridgeError;

/// A pull-based frame source over one video file.
///
/// Iterating decodes lazily, one packet at a time. The demuxer and decoder
/// are released when the source is dropped, whether or not iteration ran to
/// the end.
pub struct VideoSource {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    width: u32,
    height: u32,
    frames_per_second: f64,
    frame_count: u64,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
    path: PathBuf,
}

impl VideoSource {
    /// Open `path` and prepare a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::SourceUnavailable`] if the file does not exist,
    /// cannot be demuxed, has no video stream, or its decoder cannot be
    /// created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BridgeError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |reason: String| BridgeError::SourceUnavailable {
            path: path.clone(),
            reason,
        };

        if !path.exists() {
            return Err(unavailable("file not found".to_string()));
        }

        crate::ffmpeg::init().map_err(|error| unavailable(error.to_string()))?;
        log::debug!("Opening video source: {}", path.display());

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| unavailable(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| unavailable("no video stream found".to_string()))?;
        let video_stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| unavailable(format!("cannot create video decoder: {error}")))?;

        let width = decoder.width();
        let height = decoder.height();

        let rate = stream.avg_frame_rate();
        let frames_per_second = if rate.denominator() != 0 {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        } else {
            0.0
        };

        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else if frames_per_second > 0.0 && input_context.duration() > 0 {
            let seconds = input_context.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
            (seconds * frames_per_second) as u64
        } else {
            0
        };

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| unavailable(format!("cannot create RGB converter: {error}")))?;

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            frames_per_second,
            frame_count,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
            path,
        })
    }

    /// Native frame width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Native frame height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Average frame rate reported by the container, or 0.0 if unknown.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Frame count reported (or estimated) by the container. Informational
    /// only; iteration is the authority on how many frames exist.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The opened file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn convert_current_frame(&mut self) -> Result<DynamicImage, BridgeError> {
        self.scaler
            .run(&self.decoded_frame, &mut self.rgb_frame)
            .map_err(|error| BridgeError::VideoDecodeError(format!("RGB conversion failed: {error}")))?;

        let buffer = frame_to_buffer(&self.rgb_frame, self.width, self.height, 3);
        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            BridgeError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageRgb8(image))
    }
}

impl Iterator for VideoSource {
    type Item = Result<DynamicImage, BridgeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let converted = self.convert_current_frame();
                if converted.is_err() {
                    self.done = true;
                }
                return Some(converted);
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(BridgeError::from(error)));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(BridgeError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(BridgeError::VideoDecodeError(format!(
                        "reading {} failed: {error}",
                        self.path.display()
                    ))));
                }
            }
        }
    }
}

/// Copy plane 0 of `video_frame` into a tightly packed buffer, dropping any
/// row padding.
fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        return data[..row_length * (height as usize)].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_length * (height as usize));
    for row in 0..(height as usize) {
        let row_start = row * stride;
        buffer.extend_from_slice(&data[row_start..row_start + row_length]);
    }
    buffer
}
