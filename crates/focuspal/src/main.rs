//! FocusPal - Main Entry Point

use alerting::{CommandPlayer, FanOutDispatcher, LogDispatcher, SoundDispatcher};
use anyhow::Context;
use camera_capture::{BlankSource, FrameSource, ImageSequenceSource};
use clap::Parser;
use dms::{FaceDetector, LandmarkPredictor, Session, SessionSummary};
use focuspal::{init_logging, run_until, AppConfig, ConsoleView, ReplayLandmarks};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "focuspal", version, about = "Webcam study monitor: drowsiness, yawn, and absence alerts")]
struct Cli {
    /// Configuration file (TOML, YAML, or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Landmark trace (JSON lines) to replay; the camera is used when omitted
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Directory of recorded frames matching the trace; blank frames when omitted
    #[arg(long, requires = "landmarks")]
    frames: Option<PathBuf>,

    /// Camera device for live monitoring
    #[arg(long, conflicts_with = "landmarks")]
    camera: Option<i32>,

    /// Seed for motivational message selection
    #[arg(long)]
    seed: Option<u64>,

    /// Host poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Disable alert sounds
    #[arg(long)]
    mute: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print the session summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;

    info!("=== FocusPal v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(seed) = cli.seed {
        config.monitor.rng_seed = Some(seed);
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.host.poll_interval_ms = poll_ms;
    }
    if let Some(camera) = cli.camera {
        config.host.camera_index = camera;
    }
    if cli.mute {
        config.alerts.sound_enabled = false;
    }

    let summary = match &cli.landmarks {
        Some(trace) => replay(&config, trace, cli.frames.as_deref()).await?,
        None => live(&config).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

/// Run one session until the source runs dry or Ctrl-C
async fn monitor<S: FrameSource>(
    config: &AppConfig,
    source: S,
    detector: impl FaceDetector + 'static,
    predictor: impl LandmarkPredictor + 'static,
) -> anyhow::Result<SessionSummary> {
    let dispatcher = FanOutDispatcher::new().with(LogDispatcher).with(SoundDispatcher::new(
        config.alerts.clone(),
        CommandPlayer::from_config(&config.alerts),
    ));

    let session = Session::start(
        config.monitor.clone(),
        detector,
        predictor,
        dispatcher,
        tokio::time::Instant::now().into_std(),
    )?;

    let mut view = ConsoleView::default();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    Ok(run_until(source, session, &mut view, config.host.poll_interval(), shutdown).await)
}

async fn replay(
    config: &AppConfig,
    trace_path: &Path,
    frames: Option<&Path>,
) -> anyhow::Result<SessionSummary> {
    let trace = ReplayLandmarks::load(trace_path)
        .with_context(|| format!("loading {}", trace_path.display()))?;

    match frames {
        Some(dir) => {
            let source = ImageSequenceSource::open(dir, config.host.replay_fps)?;
            monitor(config, source, trace.detector(), trace.predictor()).await
        }
        None => {
            let source = BlankSource::new(
                config.host.frame_width,
                config.host.frame_height,
                Some(trace.frame_count()),
            );
            monitor(config, source, trace.detector(), trace.predictor()).await
        }
    }
}

#[cfg(feature = "webcam")]
async fn live(config: &AppConfig) -> anyhow::Result<SessionSummary> {
    use camera_capture::WebcamSource;
    use dms::vision::{CascadeFaceDetector, FacemarkPredictor};
    use dms::NoLandmarks;
    use tracing::warn;

    let source = WebcamSource::open(config.host.camera_index)?;
    let detector = CascadeFaceDetector::load(&config.host.face_cascade)?;

    match &config.host.landmark_model {
        Some(model) => monitor(config, source, detector, FacemarkPredictor::load(model)?).await,
        None => {
            warn!("No landmark model configured, monitoring presence only");
            monitor(config, source, detector, NoLandmarks).await
        }
    }
}

#[cfg(not(feature = "webcam"))]
async fn live(_config: &AppConfig) -> anyhow::Result<SessionSummary> {
    anyhow::bail!("built without camera support: pass --landmarks <trace> or rebuild with --features webcam")
}
