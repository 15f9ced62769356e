//! Rebuild the channel videos from simulator outputs already on disk.
//!
//! Usage:
//!   cargo run --example assemble_only -- [artifact_dir] [output_dir]

use vidbridge::{BridgeError, Channel, FrameAssembler, PipelineConfig, VideoCodec};

fn main() -> Result<(), BridgeError> {
    let mut args = std::env::args().skip(1);
    let artifact_dir = args.next().unwrap_or_else(|| ".".to_string());
    let output_dir = args.next().unwrap_or_else(|| "output_videos".to_string());

    let config = PipelineConfig::new()
        .with_artifact_dir(&artifact_dir)
        .with_output_dir(&output_dir)
        .with_codec(VideoCodec::Mpeg4);

    let report = FrameAssembler::new(&config)?.assemble()?;
    println!(
        "Found {} gray artifacts in {artifact_dir}",
        report.discovered
    );
    if let Some(gap) = report.gap_at {
        println!("Sequence stops at index {gap}; later artifacts were ignored");
    }

    if report.frames_assembled == 0 {
        println!("Nothing to assemble");
        return Ok(());
    }
    for channel in Channel::ALL {
        println!(
            "{channel}: {} frames -> {output_dir}/{}",
            report.frames_assembled,
            channel.video_file_name()
        );
    }
    Ok(())
}
