//! peerlink-agent entry point.
//!
//! Runs one acquisition: scan for peers, pick a target, connect, and
//! optionally write a payload, then exit.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()          -- TOML config + CLI overrides
//!  └─ simulated platform          -- MockRadio, MockScanSource / BondedDeviceSource,
//!  │                                 MockTransport built from [[simulation.devices]]
//!  └─ AcquireTargetUseCase::run()
//!       ├─ DiscoveryController    -- scan session, registry
//!       ├─ select_target()        -- configured heuristic
//!       ├─ ConnectionEngine       -- strategy fallback
//!       └─ StreamWriter           -- --payload
//! ```
//!
//! # Platform
//!
//! The binary wires the in-memory platform from the `[simulation]` config
//! section.  A real radio stack plugs in by implementing `RadioState`,
//! `ScanSource`, and `TransportFactory` (or `BlockingConnector`).
//!
//! Ctrl-C during the scan stops it early; selection then runs on whatever
//! was discovered so far.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use peerlink_agent::application::acquire_target::{AcquireRequest, AcquireTargetUseCase};
use peerlink_agent::application::connect_target::ConnectionEngine;
use peerlink_agent::application::discover_devices::DiscoveryController;
use peerlink_agent::application::ports::{Observer, ScanSource};
use peerlink_agent::application::write_stream::StreamWriter;
use peerlink_agent::infrastructure::observer::{FanoutObserver, JsonLinesObserver, TracingObserver};
use peerlink_agent::infrastructure::platform::bonded::BondedDeviceSource;
use peerlink_agent::infrastructure::platform::mock::{MockRadio, MockScanSource, MockTransport};
use peerlink_agent::infrastructure::storage::config::{
    default_config_path, load_config_from, save_config_to, AgentConfig, SimulatedDevice,
};
use peerlink_core::{BuiltinHeuristic, Sighting};

#[derive(Debug, Parser)]
#[command(name = "peerlink-agent", version, about = "Find a nearby peer, connect, and send a payload")]
struct Args {
    /// Config file; defaults to the platform config directory.
    #[arg(long, env = "PEERLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Scan duration in milliseconds.
    #[arg(long)]
    scan_ms: Option<u64>,

    /// Select the most recent peer whose name contains this marker.
    #[arg(long)]
    marker: Option<String>,

    /// Bytes to send once connected.
    #[arg(long)]
    payload: Option<String>,

    /// Print events to stdout as JSON lines.
    #[arg(long)]
    json: bool,

    /// Report only bonded peers instead of scanning.
    #[arg(long)]
    bonded: bool,

    /// Write the effective config to the config path and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.agent.log_level)),
        )
        .init();

    if args.init_config {
        save_config_to(&config, &config_path)?;
        info!("wrote config to {}", config_path.display());
        return Ok(());
    }

    info!("peerlink-agent starting");

    let observer: Arc<dyn Observer> = if args.json {
        Arc::new(
            FanoutObserver::new()
                .with(Arc::new(JsonLinesObserver::new(std::io::stdout())))
                .with(Arc::new(TracingObserver)),
        )
    } else {
        Arc::new(TracingObserver)
    };

    // ── Simulated platform ────────────────────────────────────────────────────
    if config.simulation.devices.is_empty() {
        warn!("no [[simulation.devices]] configured; the scan will find nothing");
    }
    let radio = Arc::new(MockRadio::enabled());
    let sightings: Vec<Sighting> = config
        .simulation
        .devices
        .iter()
        .map(SimulatedDevice::sighting)
        .collect();
    let source: Arc<dyn ScanSource> = if args.bonded {
        Arc::new(BondedDeviceSource::new(Arc::new(sightings)))
    } else {
        Arc::new(MockScanSource::new().with_sightings(sightings))
    };
    let transport = Arc::new(simulated_transport(&config.simulation.devices));

    // ── Use case ──────────────────────────────────────────────────────────────
    let discovery = DiscoveryController::new(
        radio.clone(),
        source,
        Arc::clone(&observer),
        config.discovery_config(),
    );
    let engine = Arc::new(ConnectionEngine::new(
        radio,
        transport.clone(),
        Arc::clone(&observer),
    ));
    let use_case = AcquireTargetUseCase::new(
        discovery.clone(),
        engine,
        StreamWriter::new(Arc::clone(&observer)),
        observer,
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted; stopping scan");
            discovery.stop().await;
        }
    });

    let request = AcquireRequest {
        scan_duration: config.discovery_config().scan_duration,
        heuristic: config.selection.heuristic.build(),
        strategies: config.connection.strategies.clone(),
        initial_payload: args.payload.map(String::into_bytes),
    };
    let acquisition = use_case.run(request).await.context("acquisition failed")?;
    info!(
        "connected to {} using {} ({} device(s) seen)",
        acquisition.connection.peer(),
        acquisition.connection.strategy(),
        acquisition.devices.len()
    );

    // Close our end, then show what the simulated peer received.
    drop(acquisition.connection);
    if let Some(mut remote) = transport.take_remote() {
        let mut received = Vec::new();
        remote.read_to_end(&mut received).await?;
        info!(
            "simulated peer received {} byte(s): {:?}",
            received.len(),
            String::from_utf8_lossy(&received)
        );
    }

    info!("peerlink-agent finished");
    Ok(())
}

fn apply_overrides(config: &mut AgentConfig, args: &Args) {
    if let Some(ms) = args.scan_ms {
        config.discovery.scan_duration_ms = ms;
    }
    if let Some(marker) = &args.marker {
        config.selection.heuristic = BuiltinHeuristic::NameContains {
            marker: marker.clone(),
        };
    }
}

fn simulated_transport(devices: &[SimulatedDevice]) -> MockTransport {
    devices.iter().fold(MockTransport::new(), |transport, device| {
        device.refuse.iter().fold(transport, |transport, mode| {
            transport.refuse_for(
                device.address.clone(),
                *mode,
                format!("{} refuses {mode} links", device.address),
            )
        })
    })
}
