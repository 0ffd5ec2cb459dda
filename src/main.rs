// src/main.rs
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

use skeletal_stream::sensor::SimulatedSensor;
use skeletal_stream::{run, stop_signal, ConfigHandle, RigFrame, TrackerConfig, TrackingLoop};

#[derive(Parser, Debug)]
#[command(name = "skeletal_stream", about = "Stream smoothed skeletons from a simulated sensor")]
struct Args {
    /// Tracker config (JSON); defaults to the per-user config file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of simulated people
    #[arg(long, default_value = "2")]
    people: usize,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    seconds: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TrackerConfig::default_path()
            .map(TrackerConfig::load_or_default)
            .unwrap_or_default(),
    };
    info!(?config, people = args.people, "starting skeletal stream");

    let handle = ConfigHandle::new(config)?;

    // Ticks run cooperatively on this thread, never on a worker.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(stream(handle, args))
}

async fn stream(handle: ConfigHandle, args: Args) -> Result<()> {
    let sensor = SimulatedSensor::new(args.people);
    let consumer = |frame: &RigFrame| {
        if frame.sequence % 120 == 0 {
            info!(
                sequence = frame.sequence,
                slots = ?frame.slots(),
                targets = frame.len(),
                "streaming"
            );
        }
        if tracing::enabled!(Level::DEBUG) {
            let targets = serde_json::to_string(&frame.targets()).unwrap_or_default();
            debug!(sequence = frame.sequence, %targets, "rig frame");
        }
    };

    let mut tracking = TrackingLoop::new(sensor, consumer, handle.subscribe());
    tracking.connect().context("failed to connect to sensor")?;

    let (stop, stop_rx) = stop_signal();
    let limit = args.seconds;
    let controller = async move {
        let deadline = async {
            match limit {
                Some(seconds) => {
                    tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupted"),
            _ = deadline => info!("time limit reached"),
        }
        stop.stop();
    };

    tokio::join!(run(&mut tracking, stop_rx), controller);

    let stats = tracking.stats();
    tracking.disconnect().context("failed to disconnect from sensor")?;
    info!(
        ticks = stats.ticks,
        published = stats.frames_published,
        dropped = stats.polls_dropped,
        "stopped"
    );
    Ok(())
}
