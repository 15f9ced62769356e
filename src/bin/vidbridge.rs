use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::filter::LevelFilter;
use vidbridge::{
    Channel, FfmpegLogLevel, IcarusSimulator, OperationType, Phases, Pipeline, PipelineConfig,
    PipelineReport, ProgressCallback, ProgressInfo, VideoCodec, VideoFileSinks,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidbridge --video input.mp4\n  vidbridge --video input.mp4 --width 64 --height 64 --fps 24 --progress\n  vidbridge --skip-extraction --skip-simulation --json";

#[derive(Debug, Parser)]
#[command(
    name = "vidbridge",
    version,
    about = "Run video frames through a hardware simulation and reassemble the results",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video path. Required unless --skip-extraction is set.
    #[arg(long)]
    video: Option<PathBuf>,

    /// Frame width in pixels.
    #[arg(long, default_value_t = 128)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 128)]
    height: u32,

    /// Frame rate of the output videos.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Reuse input frames already in the staging directory.
    #[arg(long)]
    skip_extraction: bool,

    /// Reuse simulator outputs already in the artifact directory.
    #[arg(long)]
    skip_simulation: bool,

    /// Do not write the output videos.
    #[arg(long)]
    skip_video_creation: bool,

    /// Directory for extracted input frames.
    #[arg(long, default_value = "frames")]
    staging_dir: PathBuf,

    /// Directory the simulator runs in and writes its outputs to.
    #[arg(long, default_value = ".")]
    artifact_dir: PathBuf,

    /// Directory for the output videos.
    #[arg(long, default_value = "output_videos")]
    output_dir: PathBuf,

    /// Output video codec (mpeg4, h264, h265).
    #[arg(long, default_value = "mpeg4")]
    codec: String,

    /// Show debug logging.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar during extraction and assembly.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long)]
    ffmpeg_log_level: Option<String>,

    /// Print a machine-readable run report.
    #[arg(long)]
    json: bool,
}

fn parse_codec(value: &str) -> Option<VideoCodec> {
    match value.to_ascii_lowercase().as_str() {
        "mpeg4" | "mp4v" => Some(VideoCodec::Mpeg4),
        "h264" | "avc" => Some(VideoCodec::H264),
        "h265" | "hevc" => Some(VideoCodec::H265),
        _ => None,
    }
}

fn parse_ffmpeg_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "debug" => Some(FfmpegLogLevel::Debug),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// One bar per phase, replaced when the reporting phase changes.
struct BarProgress {
    style: ProgressStyle,
    current: Mutex<Option<(OperationType, ProgressBar)>>,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let style = ProgressStyle::with_template(
            "{spinner:.green} {msg:>10} {bar:40.cyan/blue} {pos}/{len}",
        )?
        .progress_chars("##-");
        Ok(Self {
            style,
            current: Mutex::new(None),
        })
    }
}

fn phase_label(operation: OperationType) -> &'static str {
    match operation {
        OperationType::FrameExtraction => "extracting",
        OperationType::FrameAssembly => "assembling",
        _ => "working",
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        let stale = !matches!(&*current, Some((operation, _)) if *operation == info.operation);
        if stale {
            if let Some((_, bar)) = current.take() {
                bar.finish();
            }
            let bar = ProgressBar::new(info.total.unwrap_or(0));
            bar.set_style(self.style.clone());
            bar.set_message(phase_label(info.operation));
            *current = Some((info.operation, bar));
        }

        if let Some((_, bar)) = current.as_ref() {
            if let Some(total) = info.total {
                bar.set_length(total);
            }
            bar.set_position(info.current);
            if info.finished {
                bar.finish_with_message("done");
            }
        }
    }
}

fn report_json(report: &PipelineReport, sinks: &VideoFileSinks) -> serde_json::Value {
    let outputs: Vec<String> = if report.frames_assembled() > 0 {
        Channel::ALL
            .iter()
            .map(|&channel| sinks.path_for(channel).display().to_string())
            .collect()
    } else {
        Vec::new()
    };

    json!({
        "input_frames": report.input_frames,
        "extraction_skipped": report.extraction_skipped,
        "simulation": report.simulation.as_ref().map(|simulation| json!({
            "outputs_detected": simulation.outputs_detected,
            "compile_seconds": simulation.compile_time.as_secs_f64(),
            "run_seconds": simulation.run_time.as_secs_f64(),
        })),
        "assembly": report.assembly.map(|assembly| json!({
            "discovered": assembly.discovered,
            "frames_assembled": assembly.frames_assembled,
            "gap_at": assembly.gap_at,
        })),
        "outputs": outputs,
    })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(level) = &cli.ffmpeg_log_level {
        let parsed = parse_ffmpeg_log_level(level)
            .ok_or(format!("unsupported --ffmpeg-log-level: {level}"))?;
        vidbridge::set_ffmpeg_log_level(parsed);
    }
    let codec = parse_codec(&cli.codec).ok_or(format!("unsupported --codec: {}", cli.codec))?;

    let mut config = PipelineConfig::new()
        .with_dimensions(cli.width, cli.height)
        .with_fps(cli.fps)
        .with_staging_dir(&cli.staging_dir)
        .with_artifact_dir(&cli.artifact_dir)
        .with_output_dir(&cli.output_dir)
        .with_codec(codec);
    if cli.progress {
        config = config.with_progress(Arc::new(BarProgress::new()?));
    }

    let phases = Phases {
        skip_extraction: cli.skip_extraction,
        skip_simulation: cli.skip_simulation,
        skip_video_creation: cli.skip_video_creation,
    };
    let simulator = IcarusSimulator::new(&cli.artifact_dir);
    let mut sinks = VideoFileSinks::new(&cli.output_dir, codec);

    let report = Pipeline::new(config)?
        .with_phases(phases)
        .run(cli.video.as_deref(), simulator, &mut sinks)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report, &sinks))?);
        return Ok(());
    }

    if report
        .simulation
        .as_ref()
        .is_some_and(|simulation| !simulation.outputs_detected)
    {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "simulation produced no output frames".yellow()
        );
    }
    match report.assembly {
        Some(assembly) if assembly.frames_assembled > 0 => println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "Assembled {} frame(s) per channel into {}",
                assembly.frames_assembled,
                cli.output_dir.display()
            )
            .green()
        ),
        Some(_) => eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "no processed frames found, no videos written".yellow()
        ),
        None => println!(
            "{} {}",
            "success:".green().bold(),
            format!("Prepared {} input frame(s)", report.input_frames).green()
        ),
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
