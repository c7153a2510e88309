//! `websim` command line client
//!
//! Submits a behavior tree exported from the editor and logs the simulation as it
//! plays back.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use websim::{
    BehaviorTree, FrameSink, SimulationClient, SimulationFrame, SimulatorConfig, StatusDisplay,
};

#[derive(Debug, Parser)]
#[command(name = "websim", version, about = "Run a behavior tree on the soccer simulator")]
struct Args {
    /// Behavior tree JSON file
    tree: PathBuf,

    /// Assignment the submission belongs to
    #[arg(short, long, default_value_t = 0)]
    assignment: u64,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulator host, overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Simulator port, overrides the configuration file
    #[arg(long)]
    port: Option<u16>,

    /// Playback rate in frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Frames to buffer before playback starts
    #[arg(long)]
    lookahead: Option<usize>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<SimulatorConfig> {
        let mut config = match &self.config {
            Some(path) => SimulatorConfig::from_file(path)?,
            None => SimulatorConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fps) = self.fps {
            config.playback_fps = fps;
        }
        if let Some(lookahead) = self.lookahead {
            config.lookahead_frames = lookahead;
        }
        Ok(config)
    }
}

/// Logs every frame instead of drawing it
#[derive(Default)]
struct ConsoleSink {
    frames: u64,
}

impl FrameSink for ConsoleSink {
    fn render(&mut self, frame: &SimulationFrame) {
        self.frames += 1;
        tracing::debug!(
            frame = frame.frame_number,
            robots = frame.robots.len(),
            ball = ?frame.ball.map(|b| (b.x, b.y)),
            "Frame"
        );
    }

    fn complete(&mut self) {
        info!(frames = self.frames, "Playback complete");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    let json = std::fs::read_to_string(&args.tree)
        .with_context(|| format!("reading {}", args.tree.display()))?;
    let tree = BehaviorTree::from_json_str(&json)?;

    info!(endpoint = %config.endpoint(), "Connecting to simulator");
    let mut client = SimulationClient::new(config)?;
    let run = client.submit(tree, args.assignment)?;

    let mut status = run.status();
    tokio::spawn(async move {
        while let Some(snapshot) = status.changed().await {
            match snapshot.display {
                StatusDisplay::Show(notification) => {
                    info!(severity = notification.severity.as_str(), "{}", notification.message)
                }
                StatusDisplay::Hide => info!(phase = %snapshot.phase, "Playing"),
            }
        }
    });

    // Ctrl-C only cancels; playback then waits for the session to close the socket
    let cancel = run.cancellation();
    let interrupted = CancellationToken::new();
    let on_interrupt = interrupted.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, closing connection");
            on_interrupt.cancel();
            cancel.cancel();
        }
    });

    let mut sink = ConsoleSink::default();
    let summary = run.play(&mut sink).await?;
    if interrupted.is_cancelled() {
        info!(frames = summary.playback.frames_played(), "Run cancelled");
    } else if !summary.is_complete() {
        anyhow::bail!("simulation did not complete: {:?}", summary.session);
    }

    Ok(())
}
