//! Phase orchestration tests.

mod common;

use common::{MemorySinks, RecordingSimulator, rgb_image, write_channel_set};
use tempfile::TempDir;
use vidbridge::{
    BridgeError, Channel, FrameExtractor, Phases, Pipeline, PipelineConfig, SimulationError,
    SimulationStep, VideoCodec,
};

const SIZE: u32 = 2;

fn config_for(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new()
        .with_dimensions(SIZE, SIZE)
        .with_staging_dir(dir.path().join("frames"))
        .with_artifact_dir(dir.path())
        .with_output_dir(dir.path().join("videos"))
}

fn stage_inputs(config: &PipelineConfig, count: u8) {
    FrameExtractor::new(config)
        .expect("extractor")
        .extract_frames((0..count).map(|value| Ok(rgb_image(SIZE, SIZE, [value; 3]))))
        .expect("stage inputs");
}

#[test]
fn extraction_requires_a_video() {
    let dir = TempDir::new().expect("tempdir");
    let mut simulator = RecordingSimulator::default();
    let mut sinks = MemorySinks::new();

    let result = Pipeline::new(config_for(&dir))
        .expect("pipeline")
        .run(None, &mut simulator, &mut sinks);

    assert!(matches!(result, Err(BridgeError::InvalidConfiguration(_))));
    assert!(simulator.calls.is_empty());
    assert!(!dir.path().join("frames").exists());
}

#[test]
fn missing_video_stops_before_simulation() {
    let dir = TempDir::new().expect("tempdir");
    let mut simulator = RecordingSimulator::default();
    let mut sinks = MemorySinks::new();
    let video = dir.path().join("missing.mp4");

    let result = Pipeline::new(config_for(&dir))
        .expect("pipeline")
        .run(Some(video.as_path()), &mut simulator, &mut sinks);

    assert!(matches!(result, Err(BridgeError::SourceUnavailable { .. })));
    assert!(simulator.calls.is_empty());
    assert!(sinks.opened_channels().is_empty());
}

#[test]
fn skipped_extraction_counts_staged_frames() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&dir);
    stage_inputs(&config, 4);

    let report = Pipeline::new(config)
        .expect("pipeline")
        .with_phases(Phases {
            skip_extraction: true,
            skip_simulation: true,
            skip_video_creation: true,
        })
        .run(None, RecordingSimulator::default(), &mut MemorySinks::new())
        .expect("run");

    assert_eq!(report.input_frames, 4);
    assert!(report.extraction_skipped);
    assert!(report.simulation.is_none());
    assert!(report.assembly.is_none());
    assert_eq!(report.frames_assembled(), 0);
}

#[test]
fn staged_frames_after_a_gap_are_not_counted() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&dir);
    stage_inputs(&config, 3);
    std::fs::remove_file(dir.path().join("frames").join("input_frame_1.txt")).expect("remove");

    let report = Pipeline::new(config)
        .expect("pipeline")
        .with_phases(Phases {
            skip_extraction: true,
            skip_simulation: true,
            skip_video_creation: true,
        })
        .run(None, RecordingSimulator::default(), &mut MemorySinks::new())
        .expect("run");

    assert_eq!(report.input_frames, 1);
}

#[test]
fn assembly_only_uses_existing_outputs() {
    let dir = TempDir::new().expect("tempdir");
    for index in 0..5u64 {
        write_channel_set(dir.path(), index, SIZE, SIZE, 40);
    }
    let mut simulator = RecordingSimulator::default();
    let mut sinks = MemorySinks::new();

    let report = Pipeline::new(config_for(&dir))
        .expect("pipeline")
        .with_phases(Phases {
            skip_extraction: true,
            skip_simulation: true,
            skip_video_creation: false,
        })
        .run(None, &mut simulator, &mut sinks)
        .expect("run");

    assert!(simulator.calls.is_empty());
    assert_eq!(report.input_frames, 0);
    assert_eq!(report.frames_assembled(), 5);
    assert_eq!(sinks.frames(Channel::Negative).len(), 5);
}

#[test]
fn simulation_failure_prevents_assembly() {
    let dir = TempDir::new().expect("tempdir");
    write_channel_set(dir.path(), 0, SIZE, SIZE, 40);
    let mut simulator = RecordingSimulator {
        fail_compile: true,
        ..RecordingSimulator::default()
    };
    let mut sinks = MemorySinks::new();

    let result = Pipeline::new(config_for(&dir))
        .expect("pipeline")
        .with_phases(Phases {
            skip_extraction: true,
            ..Phases::default()
        })
        .run(None, &mut simulator, &mut sinks);

    assert!(matches!(
        result,
        Err(BridgeError::Simulation(SimulationError::CompileFailed { .. }))
    ));
    assert_eq!(simulator.calls, vec![SimulationStep::Compile]);
    assert!(sinks.opened_channels().is_empty());
}

#[test]
fn simulation_report_is_recorded() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&dir);
    stage_inputs(&config, 1);

    let report = Pipeline::new(config)
        .expect("pipeline")
        .with_phases(Phases {
            skip_extraction: true,
            skip_video_creation: true,
            ..Phases::default()
        })
        .run(None, RecordingSimulator::default(), &mut MemorySinks::new())
        .expect("run");

    let simulation = report.simulation.expect("simulation ran");
    assert!(!simulation.outputs_detected);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let config = PipelineConfig::new().with_dimensions(16, 0);
    assert!(matches!(
        Pipeline::new(config),
        Err(BridgeError::InvalidConfiguration(_))
    ));
}

#[test]
fn pipeline_keeps_the_configured_rate_and_codec() {
    let defaults = Pipeline::new(PipelineConfig::new()).expect("pipeline");
    assert_eq!(defaults.config().fps(), 30.0);
    assert_eq!(defaults.config().codec(), VideoCodec::Mpeg4);

    let config = PipelineConfig::new()
        .with_fps(24.0)
        .with_codec(VideoCodec::H264);
    let pipeline = Pipeline::new(config).expect("pipeline");
    assert_eq!(pipeline.config().fps(), 24.0);
    assert_eq!(pipeline.config().codec(), VideoCodec::H264);
}
