//! Fakes shared by the integration tests: in-memory sinks and simulators
//! that never spawn a process.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use vidbridge::{
    ArtifactKind, BridgeError, Channel, ChannelKind, FrameSink, RasterFrame, SimulationError,
    SimulationStep, Simulator, SinkFactory, codec, discover_sequence,
};

// ── Frames and artifacts ───────────────────────────────────────────

pub fn luma_frame(width: u32, height: u32, value: u8) -> RasterFrame {
    RasterFrame::Luma(GrayImage::from_pixel(width, height, Luma([value])))
}

pub fn rgb_image(width: u32, height: u32, value: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(value)))
}

/// Write a uniform output artifact in the text form of `channel`.
pub fn write_output(dir: &Path, channel: Channel, index: u64, width: u32, height: u32, value: u8) {
    let frame = luma_frame(width, height, value);
    let text = codec::encode_frame(&frame, channel.kind()).expect("encode output artifact");
    fs::write(ArtifactKind::Output(channel).path_in(dir, index), text).expect("write artifact");
}

/// Write gray, negative and binary artifacts for `index`, derived from `value`.
pub fn write_channel_set(dir: &Path, index: u64, width: u32, height: u32, value: u8) {
    write_output(dir, Channel::Gray, index, width, height, value);
    write_output(dir, Channel::Negative, index, width, height, 255 - value);
    write_output(dir, Channel::Binary, index, width, height, threshold(value));
}

pub fn threshold(value: u8) -> u8 {
    if value >= 128 { 255 } else { 0 }
}

// ── In-memory sinks ────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Recorded {
    pub frames: Vec<RasterFrame>,
    pub finish_calls: usize,
    pub geometry: Option<(u32, u32, f64)>,
}

pub struct MemorySink {
    recorded: Rc<RefCell<Recorded>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &RasterFrame) -> Result<(), BridgeError> {
        self.recorded.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BridgeError> {
        self.recorded.borrow_mut().finish_calls += 1;
        Ok(())
    }
}

/// Records every stream it opens. Opening `fail_on` returns an error.
#[derive(Default)]
pub struct MemorySinks {
    opened: Vec<(Channel, Rc<RefCell<Recorded>>)>,
    fail_on: Option<Channel>,
}

impl MemorySinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(channel: Channel) -> Self {
        Self {
            fail_on: Some(channel),
            ..Self::default()
        }
    }

    pub fn opened_channels(&self) -> Vec<Channel> {
        self.opened.iter().map(|(channel, _)| *channel).collect()
    }

    pub fn frames(&self, channel: Channel) -> Vec<RasterFrame> {
        self.recorded(channel)
            .map(|recorded| recorded.borrow().frames.clone())
            .unwrap_or_default()
    }

    pub fn geometry(&self, channel: Channel) -> Option<(u32, u32, f64)> {
        self.recorded(channel)
            .and_then(|recorded| recorded.borrow().geometry)
    }

    pub fn all_finished(&self) -> bool {
        self.opened
            .iter()
            .all(|(_, recorded)| recorded.borrow().finish_calls >= 1)
    }

    fn recorded(&self, channel: Channel) -> Option<&Rc<RefCell<Recorded>>> {
        self.opened
            .iter()
            .find(|(opened, _)| *opened == channel)
            .map(|(_, recorded)| recorded)
    }
}

impl SinkFactory for MemorySinks {
    type Sink = MemorySink;

    fn open(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        fps: f64,
    ) -> Result<MemorySink, BridgeError> {
        if self.fail_on == Some(channel) {
            return Err(BridgeError::VideoWriteError(format!(
                "cannot open {channel} stream"
            )));
        }
        let recorded = Rc::new(RefCell::new(Recorded {
            geometry: Some((width, height, fps)),
            ..Recorded::default()
        }));
        self.opened.push((channel, Rc::clone(&recorded)));
        Ok(MemorySink { recorded })
    }
}

/// The first value of every pixel, in scan order.
pub fn first_values(frame: &RasterFrame) -> Vec<u8> {
    match frame {
        RasterFrame::Luma(image) => image.as_raw().clone(),
        RasterFrame::Rgb(image) => image.pixels().map(|pixel| pixel.0[0]).collect(),
    }
}

// ── Simulators ─────────────────────────────────────────────────────

/// Records calls and fails the configured step.
#[derive(Debug, Default)]
pub struct RecordingSimulator {
    pub calls: Vec<SimulationStep>,
    pub fail_compile: bool,
    pub fail_run: bool,
}

impl Simulator for RecordingSimulator {
    fn compile(&mut self) -> Result<(), SimulationError> {
        self.calls.push(SimulationStep::Compile);
        if self.fail_compile {
            return Err(SimulationError::CompileFailed {
                command: "fake-compile".to_string(),
                code: Some(2),
            });
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), SimulationError> {
        self.calls.push(SimulationStep::Run);
        if self.fail_run {
            return Err(SimulationError::RunFailed {
                command: "fake-run".to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

/// Reads staged inputs and writes the three channels the hardware would:
/// gray = BT.601 luma, negative = 255 - gray, binary = gray >= 128.
pub struct TransformSimulator {
    pub staging_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub compiled: bool,
}

impl TransformSimulator {
    pub fn new(staging_dir: &Path, artifact_dir: &Path, width: u32, height: u32) -> Self {
        Self {
            staging_dir: staging_dir.to_path_buf(),
            artifact_dir: artifact_dir.to_path_buf(),
            width,
            height,
            compiled: false,
        }
    }

    fn process(&self, index: u64) -> Result<(), String> {
        let input_path = ArtifactKind::Input.path_in(&self.staging_dir, index);
        let text = fs::read_to_string(&input_path).map_err(|error| error.to_string())?;
        let frame = codec::decode_channel_frame(&text, self.width, self.height, ChannelKind::Rgb)
            .map_err(|error| error.to_string())?;
        let RasterFrame::Rgb(rgb) = frame else {
            return Err("expected an RGB input".to_string());
        };

        let gray = GrayImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
            Luma([luma as u8])
        });
        let negative = GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([255 - gray.get_pixel(x, y).0[0]])
        });
        let binary = GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([threshold(gray.get_pixel(x, y).0[0])])
        });

        for (channel, image) in [
            (Channel::Gray, gray),
            (Channel::Negative, negative),
            (Channel::Binary, binary),
        ] {
            let text = codec::encode_frame(&RasterFrame::Luma(image), channel.kind())
                .map_err(|error| error.to_string())?;
            fs::write(
                ArtifactKind::Output(channel).path_in(&self.artifact_dir, index),
                text,
            )
            .map_err(|error| error.to_string())?;
        }
        Ok(())
    }
}

impl Simulator for TransformSimulator {
    fn compile(&mut self) -> Result<(), SimulationError> {
        self.compiled = true;
        Ok(())
    }

    fn run(&mut self) -> Result<(), SimulationError> {
        let failed = || SimulationError::RunFailed {
            command: "transform".to_string(),
            code: Some(1),
        };
        if !self.compiled {
            return Err(failed());
        }
        let inputs =
            discover_sequence(&self.staging_dir, ArtifactKind::Input).map_err(|_| failed())?;
        for index in 0..inputs.truncation_bound() {
            self.process(index).map_err(|_| failed())?;
        }
        Ok(())
    }
}
