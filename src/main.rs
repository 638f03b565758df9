mod config;
mod control;
mod display;
mod errors;
mod fleet;
mod ha;
mod miner;

use std::cmp::max;
use std::sync::mpsc::{self, RecvTimeoutError};

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tracing::{debug, error, info, warn};

use config::Config;
use display::SocTicker;
use fleet::Fleet;
use ha::HaClient;
use miner::MinerSession;

/// Start / stop VNish miners based on battery SoC
#[derive(Parser)]
#[command(name = "vnish-soc-rs")]
#[command(version)]
#[command(about = "Start / stop VNish miners based on battery SoC", long_about = None)]
struct Cli {
    /// Base URL of Home Assistant
    #[arg(long)]
    ha_url: String,

    /// Entity ID of the SoC sensor
    #[arg(long)]
    sensor: String,

    /// Path to the miners configuration file
    #[arg(short, long, default_value = "miners.toml")]
    config: String,

    /// Polling interval in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    poll: u64,

    /// Home Assistant long-lived token
    #[arg(long, env = "HA_TOKEN", hide_env_values = true)]
    ha_token: String,
}

/// Round timestamp to the next modulo boundary of the interval.
/// Example: next_interval(12.3s, 5s) -> 15.0s
fn next_interval(time: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let duration_since_last_interval = Duration::seconds(time.timestamp() % interval.num_seconds());
    time - duration_since_last_interval + interval
}

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration first (to get log level)
    let config = Config::from_file(&cli.config)?;

    // Initialize tracing with log level from config. Events go to stderr;
    // stdout belongs to the updating SoC line.
    let app_log_level = config.default.log_level.as_str();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("vnish_soc_rs={}", app_log_level).parse()?)
                .add_directive("ureq=warn".parse()?), // Only show warnings/errors from ureq
        )
        .init();

    let interval = Duration::seconds(cli.poll as i64);

    info!("Configuration loaded from: {}", cli.config);
    info!("Log level: {}", config.default.log_level);
    info!("  HA URL: {}", cli.ha_url);
    info!("  Sensor: {}", cli.sensor);
    info!("  Poll interval: {}s", cli.poll);

    info!("Loaded {} miner(s)", config.miners.len());
    if config.miners.is_empty() {
        warn!("miner list is empty, nothing to control");
    }

    let ha = HaClient::new(&cli.ha_url, cli.ha_token, &cli.sensor);

    let mut fleet = Fleet::new();
    for miner in &config.miners {
        if miner.has_inverted_band() {
            warn!(
                miner = %miner.ip,
                "resume_soc {} <= stop_soc {}: degenerate dead-band, expect start/stop cycling",
                miner.resume_soc,
                miner.stop_soc
            );
        }
        info!(
            "  Miner {}: stop < {:.1}%, resume > {:.1}%",
            miner.ip, miner.stop_soc, miner.resume_soc
        );
        fleet.push(MinerSession::new(miner), miner.stop_soc, miner.resume_soc);
    }

    // SIGINT feeds a channel so the inter-tick sleep stays interruptible.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })?;

    let ticker = SocTicker;
    let mut next_loop = Utc::now();
    info!("Starting control loop...");

    loop {
        let now = Utc::now();
        if now >= next_loop {
            next_loop = next_interval(now, interval);

            match ha.get_soc() {
                Ok(soc) => {
                    ticker.update(soc);
                    fleet.run_tick(soc);
                    debug!(
                        "tick complete: soc={soc:.1}% cumulative_errors={}",
                        fleet.total_errors()
                    );
                }
                // A failed reading skips this tick only; the next tick retries.
                Err(e) => error!("telemetry fetch failed, skipping tick: {e}"),
            }
        }

        // Compensate the sleep for execution time
        let sleep_duration = max(next_loop - Utc::now(), Duration::milliseconds(100));

        match shutdown_rx.recv_timeout(
            sleep_duration
                .to_std()
                .expect("Sleep duration invalid - this is a bug in timing calculation"),
        ) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    ticker.finish();
    info!("Shutdown requested, exiting");
    Ok(())
}
