//! live-feed — drive the ft engine headless.
//!
//! Simulates a small Bengaluru fleet (or a roster/route set loaded from CSV)
//! and, when `--server` is given, subscribes to the fleet server's topics
//! over TCP.  Everything the engine publishes is logged; there is no map.
//!
//! ```text
//! RUST_LOG=debug cargo run -p live-feed -- --seconds 5
//! cargo run -p live-feed -- --server 127.0.0.1:9000 --topic vehicles --topic alerts
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ft_bus::{topic_event, topics, EngineBus, CONNECT, DISCONNECT, RECONNECT_FAILED, ROSTER};
use ft_core::{EngineConfig, LatLng, LoopPolicy, RouteId, RouteRef, TrackedEntity};
use ft_route::{load_routes_csv, RouteSet};
use ft_sim::{load_roster_csv, SimDriver};
use ft_transport::{TcpConnector, TransportClient};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "live-feed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON engine configuration; every field is optional.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route CSV (`route_id,seq,lat,lng`).
    #[arg(long)]
    routes: Option<PathBuf>,

    /// Roster CSV (`id,lat,lng,speed_kph,route_id,loop_policy,parked`).
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Fleet server `host:port`.  Without it only the simulator runs.
    #[arg(long)]
    server: Option<String>,

    /// Topics to subscribe to.
    #[arg(long = "topic", default_values_t = [topics::VEHICLES.to_string()])]
    topics: Vec<String>,

    /// How long to run.
    #[arg(long, default_value = "10")]
    seconds: u64,

    /// Host frame rate.
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Log a roster summary every N updates.
    #[arg(long, default_value = "20")]
    every: u64,
}

// ── Built-in fleet ────────────────────────────────────────────────────────────

fn builtin_routes() -> RouteSet {
    [
        (RouteId::from("MG-ROAD"), vec![
            LatLng::new(12.9716, 77.5946),
            LatLng::new(12.9755, 77.6060),
            LatLng::new(12.9781, 77.6205),
        ]),
        (RouteId::from("KORAMANGALA"), vec![
            LatLng::new(12.9352, 77.6245),
            LatLng::new(12.9279, 77.6271),
            LatLng::new(12.9141, 77.6411),
            LatLng::new(12.9352, 77.6245),
        ]),
    ]
    .into_iter()
    .collect()
}

fn builtin_roster() -> Vec<TrackedEntity> {
    vec![
        TrackedEntity::new("V001", LatLng::new(12.9716, 77.5946), 45.5)
            .with_route(RouteRef::Id("MG-ROAD".into()))
            .with_loop_policy(LoopPolicy::StopAtEnd),
        TrackedEntity::new("V002", LatLng::new(12.9352, 77.6245), 52.3)
            .with_route(RouteRef::Id("KORAMANGALA".into())),
        TrackedEntity::new("V003", LatLng::new(12.9141, 77.6411), 0.0),
        TrackedEntity::new("V004", LatLng::new(12.9600, 77.6400), 30.0),
    ]
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

// ── Bus wiring ────────────────────────────────────────────────────────────────

fn wire_logging(bus: &EngineBus, topics: &[String], every: u64) {
    let updates = Arc::new(AtomicU64::new(0));
    bus.on(ROSTER, move |ev| {
        let Some(update) = ev.as_roster() else { return Ok(()) };
        let n = updates.fetch_add(1, Ordering::Relaxed) + 1;
        if n % every.max(1) == 0 {
            for e in update.entities.iter() {
                info!(tick = %update.tick, id = %e.id, pos = %e.position, kph = e.speed_kph, "roster");
            }
        }
        Ok(())
    });

    for name in [CONNECT, DISCONNECT, RECONNECT_FAILED] {
        bus.on(name, move |_| {
            info!(event = name, "connection");
            Ok(())
        });
    }

    for topic in topics {
        bus.on(topic_event(topic), |ev| {
            if let Some(m) = ev.as_message() {
                info!(kind = %m.kind, topic = ?m.topic, fields = m.data.len(), "message");
            }
            Ok(())
        });
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None       => EngineConfig::default(),
    };
    let routes = match &cli.routes {
        Some(path) => load_routes_csv(path)?,
        None       => builtin_routes(),
    };
    let roster = match &cli.roster {
        Some(path) => load_roster_csv(path)?,
        None       => builtin_roster(),
    };
    info!(routes = routes.len(), entities = roster.len(), "fleet loaded");

    let bus = EngineBus::new();
    wire_logging(&bus, &cli.topics, cli.every);

    let mut driver = SimDriver::start(config.sim.clone(), routes, bus.clone())?;
    driver.set_roster(roster)?;
    info!(mode = ?driver.mode(), tick_hz = config.sim.tick_hz, "simulator running");

    let client = match &cli.server {
        Some(addr) => {
            let client =
                TransportClient::start(config.transport.clone(), TcpConnector::new(addr), bus.clone())?;
            for topic in &cli.topics {
                client.subscribe(topic.as_str());
            }
            client.connect();
            Some(client)
        }
        None => None,
    };

    let mut frames = tokio::time::interval(Duration::from_secs(1) / cli.fps.max(1));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.seconds);
    loop {
        tokio::select! {
            at = frames.tick() => {
                if at >= deadline {
                    break;
                }
                driver.on_frame(at.into_std());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    driver.stop();
    if let Some(client) = client {
        client.shutdown().await;
    }
    if let Some(last) = driver.latest() {
        info!(tick = %last.tick, entities = last.entities.len(), "done");
    }
    Ok(())
}
