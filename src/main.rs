use std::sync::Arc;
use std::time::Instant;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tactical_swarm::config::SimConfig;
use tactical_swarm::metrics::{self, Metrics};
use tactical_swarm::sim::simulation::Simulation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Tactical Swarm v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: scenario={}, tick_rate={}Hz, max_dt={}s, intent_interval={:?}, intent_ttl={:?}",
        config.scenario, config.tick_rate, config.max_dt, config.intent_interval, config.intent_ttl
    );

    let metrics = Arc::new(Metrics::new());
    if config.metrics_port > 0 {
        let metrics_clone = metrics.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    } else {
        info!("Metrics endpoint disabled");
    }

    let mut sim = Simulation::new(config.clone())?.with_metrics(metrics.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        _ = run(&mut sim, &config) => {}
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!(
        "Simulation stopped after {} ticks ({:.1}s simulated)",
        sim.clock().tick(),
        sim.clock().sim_time()
    );
    Ok(())
}

/// Fixed-rate headless loop
async fn run(sim: &mut Simulation, config: &SimConfig) {
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();
    let mut last_log = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let output = sim.tick(now - last_tick);
        last_tick = now;

        for alert in &output.alerts {
            info!(
                "Threat alert: {} ({}) event in {:.0}s",
                alert.callsign, alert.id, alert.time_to_event
            );
        }

        if last_log.elapsed() >= config.telemetry_log_interval {
            last_log = now;
            let t = &output.telemetry;
            info!(
                "Tick {}: {} active, polarization={:.3} milling={:.3} cohesion={:.3} com=({:.1}, {:.1})",
                output.tick,
                t.active_count,
                t.polarization,
                t.milling,
                t.cohesion,
                t.center_of_mass.x,
                t.center_of_mass.y
            );
        }
    }
}
