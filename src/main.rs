//! CLI entry point for `livemea`.
//!
//! One invocation runs one capture session: connect to the streaming service,
//! buffer snapshots to the frame target, write the capture, exit. Ctrl-C
//! cancels the session; teardown still runs and the cancellation is reported.

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use livemea::config::{CaptureConfig, OfflinePolicy, SourceId};
use livemea::coordinator::AcquisitionCoordinator;

#[derive(Parser)]
#[command(name = "livemea")]
#[command(about = "Capture live MEA data from the LiveMEA service", long_about = None)]
struct Cli {
    /// Number of snapshots to capture. Named for compatibility with the
    /// original tool; this is a frame count, not seconds.
    #[arg(long, default_value_t = 5)]
    duration: usize,

    /// Output path; extension is normalized to the selected format.
    #[arg(long, default_value = "live_data.h5")]
    output: String,

    /// MEA source id, 0-3.
    #[arg(long, default_value_t = 0)]
    mea_id: u8,

    /// Service base URL.
    #[arg(long)]
    url: Option<String>,

    /// Keep streaming to the frame target even if the liveness probe reports
    /// the service offline.
    #[arg(long)]
    ignore_offline: bool,

    /// Log filter, e.g. "info" or "livemea=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut config = CaptureConfig::new(&cli.output, cli.duration, SourceId::new(cli.mea_id)?)?;
    if let Some(url) = cli.url {
        config = config.with_base_url(url)?;
    }
    if cli.ignore_offline {
        config = config.with_offline_policy(OfflinePolicy::WarnOnly);
    }

    info!(
        frames = config.frames(),
        source = %config.source_id(),
        output = %config.save_path().display(),
        "starting capture session"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match AcquisitionCoordinator::new(config).record(cancel).await {
        Ok(samples) => {
            info!(snapshots = samples.len(), "capture session finished");
            Ok(())
        }
        Err(err) => {
            error!(%err, "capture session failed");
            Err(err.into())
        }
    }
}
