//! Relay Network Simulator
//!
//! Steps an Earth-Moon scenario through time, rebuilding the visibility
//! topology at each step and relaying the scenario's traffic across it.
//!
//! Usage:
//!   relay-sim --scenario scenario.json --epoch 2031-07-14T00:00:00Z \
//!             --steps 24 --step-minutes 30

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use orbital_mechanics::Epoch;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;
mod scenario;

use report::Summary;
use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(
    name = "relay-sim",
    about = "Simulate message relay across an Earth-Moon communication network"
)]
struct Args {
    /// Scenario JSON file; the built-in Earth-Moon scenario when omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Start epoch (RFC 3339)
    #[arg(short, long, default_value = "2000-01-01T12:00:00Z")]
    epoch: DateTime<Utc>,

    /// Number of propagation steps
    #[arg(long, default_value_t = 12)]
    steps: u32,

    /// Simulated time between steps
    #[arg(long, default_value_t = 60.0)]
    step_minutes: f64,

    /// Antenna slew time in milliseconds, overriding the scenario
    #[arg(long, env = "RELAY_SLEW_MS")]
    slew_ms: Option<u64>,

    /// Sleep through slews and light-times on the wall clock
    #[arg(long)]
    realtime: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "relay_sim=debug,relay_network=debug,orbital_mechanics=info"
    } else {
        "relay_sim=info,relay_network=info,warn"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !args.realtime {
        // Protocol delays run on a virtual clock that jumps between timers
        tokio::time::pause();
    }

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    if let Some(slew_ms) = args.slew_ms {
        scenario.relay.slew_time_ms = slew_ms;
    }

    let start = Epoch::from_datetime(args.epoch).context("start epoch")?;
    let sim = scenario.build(start).context("building scenario")?;
    let network = &sim.network;
    let mut events = network.subscribe();
    let mut summary = Summary::new(scenario.name.as_str());

    info!("{}", "=".repeat(60));
    info!("Relay network simulation: {}", scenario.name);
    info!("{}", "=".repeat(60));

    for step in 0..args.steps {
        let epoch = start.add_seconds(f64::from(step) * args.step_minutes * 60.0);
        network
            .propagate_all(epoch)
            .with_context(|| format!("propagating to {epoch}"))?;

        let stats = network.topology()?.stats();
        let moon_range_km = network.world().read().distance(sim.bodies.earth, sim.bodies.moon)? / 1_000.0;
        info!(
            step,
            %epoch,
            moon_range_km = moon_range_km.round(),
            nodes = stats.nodes,
            links = stats.links,
            carrier_links = stats.carrier_links,
            isolated = stats.isolated_nodes,
            "topology"
        );

        for traffic in &sim.traffic {
            match network.originate(traffic.kind, traffic.from, traffic.to).await {
                Ok(Some(_)) => summary.routed += 1,
                Ok(None) => summary.unroutable += 1,
                Err(err) => warn!(from = %traffic.from, to = %traffic.to, error = %err, "send failed"),
            }
        }
        network.wait_idle().await;
        summary.drain(&mut events);
        summary.steps += 1;
    }

    info!(
        routed = summary.routed,
        unroutable = summary.unroutable,
        delivered = summary.count("delivered"),
        dropped = summary.count("dropped"),
        "simulation complete"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
