//! Red Light Referee
//!
//! Runs the phase clock, the frame analysis loop and the HTTP surface in one
//! process.
//!
//! # Usage
//!
//! ```bash
//! # Built-in defaults (no camera driver: placeholder frames)
//! cargo run --release
//!
//! # Live frames from a webcam through ffmpeg
//! ffmpeg -f v4l2 -i /dev/video0 -s 640x480 -f rawvideo -pix_fmt rgb24 - \
//!     | ./redlight-referee --stdin
//!
//! # Explicit config and bind address
//! ./redlight-referee --config referee.toml --addr 127.0.0.1:5000
//! ```
//!
//! # Environment Variables
//!
//! - `REFEREE_CONFIG`: path to a TOML config file
//! - `REFEREE_SERVER_ADDR`: HTTP bind address override
//! - `REFEREE_CORS_ORIGINS`: comma-separated allowed origins
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use redlight_referee::api::{create_app, ApiState};
use redlight_referee::config::RefereeConfig;
use redlight_referee::game::{GameClock, SharedReferee, StateGateway};
use redlight_referee::motion::MotionClassifier;
use redlight_referee::pipeline::{
    frame_channel, open_or_placeholder, CameraBackend, FrameAnalysisLoop, NoCaptureBackend,
    PlaceholderSource, PpmRenderer, StdinBackend,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "redlight-referee")]
#[command(about = "Referee for the freeze-when-red motion game")]
#[command(version)]
struct CliArgs {
    /// Path to a referee.toml. Failing to load it is fatal.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default from config: "0.0.0.0:5000")
    #[arg(short, long, env = "REFEREE_SERVER_ADDR", value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Read raw RGB24 frames of camera.width x camera.height from stdin
    #[arg(long)]
    stdin: bool,

    /// Camera device index
    #[arg(long)]
    device: Option<u32>,

    /// Motion area threshold in pixels
    #[arg(long)]
    threshold: Option<u32>,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    GameClock,
    FrameAnalysis,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::GameClock => write!(f, "GameClock"),
            TaskName::FrameAnalysis => write!(f, "FrameAnalysis"),
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe cancellation and release their resources.
    while let Some(result) = task_set.join_next().await {
        if let Ok(Ok(task_name)) = result {
            info!("Supervisor: task {} stopped", task_name);
        }
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<RefereeConfig> {
    let mut config = match &args.config {
        Some(path) => RefereeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RefereeConfig::load(),
    };

    if let Some(device) = args.device {
        config.camera.device_index = device;
    }
    if let Some(threshold) = args.threshold {
        config.motion.threshold_area = threshold;
    }
    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    config
        .validate()
        .context("Invalid configuration after command-line overrides")?;
    Ok(config)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let rules = config.game_rules()?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Red Light Referee");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        policy = rules.clock.name(),
        penalty = %rules.penalty.action,
        cooldown_ms = config.penalty.cooldown_ms,
        threshold = config.motion.threshold_area,
        "Game rules"
    );

    let referee = SharedReferee::new(rules, config.motion.threshold_area);
    let gateway = StateGateway::new(referee.clone());

    // Frame source
    let backend: Box<dyn CameraBackend> = if args.stdin {
        Box::new(StdinBackend {
            width: config.camera.width,
            height: config.camera.height,
        })
    } else {
        Box::new(NoCaptureBackend)
    };
    let placeholder = PlaceholderSource::new(
        config.camera.width,
        config.camera.height,
        config.placeholder.fps,
    );
    let source = open_or_placeholder(
        backend.as_ref(),
        config.camera.device_index,
        config.camera.backend_hint.as_deref(),
        placeholder,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;
    info!("HTTP server listening on {}", config.server.addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let (frames_tx, frames_rx) = frame_channel();
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    let app = create_app(ApiState {
        gateway,
        frames: frames_rx,
    });
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 2: Game Clock
    let clock = GameClock::new(referee.clone(), cancel_token.clone());
    task_set.spawn(async move {
        info!("[GameClock] Task starting");
        let stats = clock.run().await;
        info!(ticks = stats.ticks, transitions = stats.transitions, "[GameClock] Stopped");
        Ok(TaskName::GameClock)
    });

    // Task 3: Frame Analysis
    let analysis = FrameAnalysisLoop::new(
        referee,
        MotionClassifier::new(config.motion_params()),
        Arc::new(PpmRenderer),
        frames_tx,
        cancel_token.clone(),
    )
    .with_placeholder(
        config.camera.width,
        config.camera.height,
        config.placeholder.fps,
    );
    task_set.spawn(async move {
        info!("[FrameAnalysis] Task starting");
        analysis.run(source).await;
        Ok(TaskName::FrameAnalysis)
    });

    run_supervisor(&mut task_set, cancel_token).await
}
