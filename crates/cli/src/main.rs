use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::{Arc, Mutex};

use clap::{Args, Parser, Subcommand};

use dispatch_monitor_core::annotation::domain::annotation_sink::AnnotationSink;
use dispatch_monitor_core::annotation::domain::frame_annotator::FrameAnnotator;
use dispatch_monitor_core::annotation::infrastructure::box_renderer::BoxRenderer;
use dispatch_monitor_core::annotation::infrastructure::flagged_frame_sink::FlaggedFrameSink;
use dispatch_monitor_core::annotation::infrastructure::json_lines_log::JsonLinesLog;
use dispatch_monitor_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use dispatch_monitor_core::detection::infrastructure::tracking_detector::TrackingDetector;
use dispatch_monitor_core::optimization::domain::q_learning_optimizer::QLearningOptimizer;
use dispatch_monitor_core::optimization::domain::reward::RewardModel;
use dispatch_monitor_core::optimization::domain::threshold_environment::ThresholdEnvironment;
use dispatch_monitor_core::optimization::domain::threshold_space::ThresholdSpace;
use dispatch_monitor_core::optimization::infrastructure::video_episode_source::VideoEpisodeSource;
use dispatch_monitor_core::pipeline::annotation_stage::AnnotationStage;
use dispatch_monitor_core::pipeline::infrastructure::sequential_pipeline_executor::SequentialPipelineExecutor;
use dispatch_monitor_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use dispatch_monitor_core::pipeline::optimize_threshold_use_case::{
    check_inputs, write_recommendation, OptimizeThresholdUseCase,
};
use dispatch_monitor_core::pipeline::pipeline_executor::PipelineExecutor;
use dispatch_monitor_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use dispatch_monitor_core::pipeline::process_video_use_case::ProcessVideoUseCase;
use dispatch_monitor_core::pipeline::sample_clip_use_case::SampleClipUseCase;
use dispatch_monitor_core::shared::config::MonitorConfig;
use dispatch_monitor_core::shared::constants::{
    DEFAULT_CLIP_SECONDS, FEEDBACK_DIR, TRACKER_MAX_LOST,
};
use dispatch_monitor_core::shared::error::MonitorError;
use dispatch_monitor_core::shared::roi::Roi;
use dispatch_monitor_core::video::domain::video_reader::VideoReader;
use dispatch_monitor_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use dispatch_monitor_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use dispatch_monitor_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Item tracking and confidence-threshold tuning for dispatch-counter video.
#[derive(Parser)]
#[command(name = "dispatch-monitor", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect, track and annotate items inside the ROI of a video.
    Process(ProcessArgs),
    /// Learn the confidence threshold that keeps the item count in range.
    Optimize(OptimizeArgs),
    /// Shorten a video to a test clip by keeping evenly spaced frames.
    Clip(ClipArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Config file (defaults to the per-user config location).
    #[arg(long)]
    config: Option<PathBuf>,

    /// ONNX model, overriding the config file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Region of interest as x1,y1,x2,y2, overriding the config file.
    #[arg(long, value_delimiter = ',')]
    roi: Option<Vec<i32>>,
}

#[derive(Args)]
struct ProcessArgs {
    input: PathBuf,
    output: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Display confidence threshold (0.0-1.0), overriding the config file.
    #[arg(long)]
    threshold: Option<f64>,

    /// Frame indices to save for relabeling (comma-separated).
    #[arg(long, value_delimiter = ',')]
    flag_frames: Option<Vec<usize>>,

    /// Directory for flagged frames.
    #[arg(long, default_value = FEEDBACK_DIR)]
    feedback_dir: PathBuf,

    /// Write per-frame boxes and labels as JSON lines.
    #[arg(long)]
    annotation_log: Option<PathBuf>,

    /// Run every stage on one thread.
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct OptimizeArgs {
    video: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long)]
    episodes: Option<usize>,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Decode the video once and keep the ROI crops in memory.
    #[arg(long)]
    cache_frames: bool,

    /// Store the recommended threshold in the config file.
    #[arg(long)]
    write_config: bool,
}

#[derive(Args)]
struct ClipArgs {
    input: PathBuf,
    output: PathBuf,

    /// Target clip duration in seconds.
    #[arg(long, default_value_t = DEFAULT_CLIP_SECONDS)]
    seconds: f64,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        let code = e
            .downcast_ref::<MonitorError>()
            .map(MonitorError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process(args) => run_process(args),
        Command::Optimize(args) => run_optimize(args),
        Command::Clip(args) => run_clip(args),
    }
}

/// Loads the config file and applies command-line overrides.
fn load_config(args: &ConfigArgs) -> Result<(PathBuf, MonitorConfig), MonitorError> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => MonitorConfig::default_path()?,
    };
    let mut config = MonitorConfig::load_or_default(&path)?;

    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(roi) = &args.roi {
        let [x1, y1, x2, y2] = roi[..] else {
            return Err(MonitorError::InvalidConfig(format!(
                "--roi takes x1,y1,x2,y2, got {} value(s)",
                roi.len()
            )));
        };
        config.roi = Roi::new(x1, y1, x2, y2);
    }
    Ok((path, config))
}

fn validated(config: MonitorConfig) -> Result<MonitorConfig, MonitorError> {
    config.validate().map_err(MonitorError::InvalidConfig)?;
    Ok(config)
}

fn build_detector(config: &MonitorConfig) -> Result<OnnxYoloDetector, MonitorError> {
    log::info!("Loading model {}", config.model_path.display());
    OnnxYoloDetector::new(&config.model_path).map_err(MonitorError::detector)
}

/// Adapts a `PipelineLogger` to the frame-progress callback of the
/// video use cases; always asks to continue.
fn progress_callback(
    logger: Arc<Mutex<StdoutPipelineLogger>>,
) -> Box<dyn Fn(usize, usize) -> bool + Send> {
    Box::new(move |current, total| {
        if let Ok(mut logger) = logger.lock() {
            logger.progress(current, total);
        }
        true
    })
}

fn run_process(args: ProcessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut config) = load_config(&args.config)?;
    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    let config = validated(config)?;
    check_inputs(&config.model_path, &args.input)?;

    let detector = TrackingDetector::new(
        Box::new(build_detector(&config)?),
        TRACKER_MAX_LOST,
        config.confidence_threshold,
    );

    let mut sinks: Vec<Box<dyn AnnotationSink>> = Vec::new();
    if let Some(frames) = args.flag_frames {
        let frames: HashSet<usize> = frames.into_iter().collect();
        sinks.push(Box::new(
            FlaggedFrameSink::new(Box::new(ImageFileWriter::new()), &args.feedback_dir, frames)
                .map_err(MonitorError::video)?,
        ));
    }
    if let Some(path) = &args.annotation_log {
        sinks.push(Box::new(JsonLinesLog::create(path).map_err(MonitorError::video)?));
    }

    let stage = AnnotationStage::new(
        FrameAnnotator::new(config.smoothing.clone(), config.class_names.clone()),
        Box::new(BoxRenderer::default()),
        sinks,
        config.roi,
        config.confidence_threshold,
    );

    let mut reader: Box<dyn VideoReader> = Box::new(FfmpegReader::new());
    let metadata = reader.open(&args.input).map_err(MonitorError::video)?;
    let executor: Box<dyn PipelineExecutor> = if args.sequential {
        Box::new(SequentialPipelineExecutor::new())
    } else {
        Box::new(ThreadedPipelineExecutor::new())
    };

    let logger = Arc::new(Mutex::new(StdoutPipelineLogger::for_frames()));
    let mut use_case = ProcessVideoUseCase::new(
        reader,
        Box::new(FfmpegWriter::new()),
        Box::new(detector),
        stage,
        executor,
        Some(progress_callback(logger.clone())),
        None,
    );
    let stats = use_case.execute(&metadata, &args.output)?;
    if let Ok(mut logger) = logger.lock() {
        logger.metric("boxes_per_frame", stats.boxes as f64 / stats.frames.max(1) as f64);
        logger.summary();
    }
    Ok(())
}

fn run_optimize(args: OptimizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, mut config) = load_config(&args.config)?;
    if let Some(episodes) = args.episodes {
        config.optimizer.episodes = episodes;
    }
    if args.seed.is_some() {
        config.optimizer.seed = args.seed;
    }
    config.optimizer.cache_frames |= args.cache_frames;
    let config = validated(config)?;
    check_inputs(&config.model_path, &args.video)?;

    let space = ThresholdSpace::new(config.optimizer.candidate_thresholds.clone())
        .map_err(MonitorError::InvalidConfig)?;
    let reward = RewardModel::new(config.reward.clone());
    let env = ThresholdEnvironment::new(Box::new(build_detector(&config)?), space, reward);
    let source = VideoEpisodeSource::new(Box::new(FfmpegReader::new()), &args.video, config.roi);

    let mut use_case = OptimizeThresholdUseCase::new(
        QLearningOptimizer::new(config.optimizer.clone())?,
        env,
        Box::new(source),
        Box::new(StdoutPipelineLogger::for_episodes()),
        None,
    );
    let report = use_case.execute()?;
    println!("{:.2}", report.recommended_threshold);

    if args.write_config {
        write_recommendation(&config_path, report.recommended_threshold)?;
    }
    Ok(())
}

fn run_clip(args: ClipArgs) -> Result<(), Box<dyn std::error::Error>> {
    let logger = Arc::new(Mutex::new(StdoutPipelineLogger::for_frames()));
    let mut use_case = SampleClipUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        args.seconds,
        Some(progress_callback(logger)),
    );
    let stats = use_case.execute(&args.input, &args.output)?;
    println!("{}", output_summary(&args.output, stats.frames_written));
    Ok(())
}

fn output_summary(path: &Path, frames: usize) -> String {
    format!("{} ({frames} frames)", path.display())
}
