//! Prometheus-compatible metrics endpoint
//!
//! Exposes simulation metrics in Prometheus format for Grafana dashboards.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::sim::store::Population;
use crate::sim::systems::telemetry::TelemetrySnapshot;

/// Rolling window for tick time percentiles
const TICK_HISTORY_LEN: usize = 1000;

/// Gauge holding an f64 as raw bits
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Per-tick values handed to [`Metrics::observe_tick`]
#[derive(Debug, Clone, Copy)]
pub struct TickSample<'a> {
    pub elapsed: Duration,
    pub population: Population,
    pub telemetry: &'a TelemetrySnapshot,
    pub sim_time: f64,
    pub generation: u64,
}

/// Metrics registry for the simulation
#[derive(Debug)]
pub struct Metrics {
    // Agent counts
    pub agents_hostile: AtomicU64,
    pub agents_friendly: AtomicU64,
    pub agents_neutral: AtomicU64,
    pub agents_swarm: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Tactical intent exchange
    pub intent_requests: AtomicU64,
    pub intent_responses: AtomicU64,
    pub intents_applied: AtomicU64,
    pub intents_unknown: AtomicU64,
    pub intent_responses_stale: AtomicU64,
    pub intents_expired: AtomicU64,
    pub intent_dispatches_skipped: AtomicU64,
    pub worker_connected: AtomicU64, // 0 or 1

    pub alerts_fired: AtomicU64,

    // Latest telemetry
    pub polarization: AtomicF64,
    pub milling: AtomicF64,
    pub cohesion: AtomicF64,
    /// Largest steering force in the last flocking pass
    pub steering_peak_force: AtomicF64,

    pub sim_time_seconds: AtomicF64,
    pub generation: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            agents_hostile: AtomicU64::new(0),
            agents_friendly: AtomicU64::new(0),
            agents_neutral: AtomicU64::new(0),
            agents_swarm: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            intent_requests: AtomicU64::new(0),
            intent_responses: AtomicU64::new(0),
            intents_applied: AtomicU64::new(0),
            intents_unknown: AtomicU64::new(0),
            intent_responses_stale: AtomicU64::new(0),
            intents_expired: AtomicU64::new(0),
            intent_dispatches_skipped: AtomicU64::new(0),
            worker_connected: AtomicU64::new(0),
            alerts_fired: AtomicU64::new(0),
            polarization: AtomicF64::new(0.0),
            milling: AtomicF64::new(0.0),
            cohesion: AtomicF64::new(0.0),
            steering_peak_force: AtomicF64::new(0.0),
            sim_time_seconds: AtomicF64::new(0.0),
            generation: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record everything the simulation publishes once per tick
    pub fn observe_tick(&self, sample: TickSample<'_>) {
        self.record_tick_time(sample.elapsed);

        self.agents_hostile.store(sample.population.hostile as u64, Ordering::Relaxed);
        self.agents_friendly.store(sample.population.friendly as u64, Ordering::Relaxed);
        self.agents_neutral.store(sample.population.neutral as u64, Ordering::Relaxed);
        self.agents_swarm.store(sample.population.swarm as u64, Ordering::Relaxed);

        self.polarization.store(sample.telemetry.polarization);
        self.milling.store(sample.telemetry.milling);
        self.cohesion.store(sample.telemetry.cohesion);

        self.sim_time_seconds.store(sample.sim_time);
        self.generation.store(sample.generation, Ordering::Relaxed);
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Agents
        metric!("tactical_swarm_agents_hostile", "Number of hostile agents", "gauge",
            self.agents_hostile.load(Ordering::Relaxed));
        metric!("tactical_swarm_agents_friendly", "Number of friendly agents", "gauge",
            self.agents_friendly.load(Ordering::Relaxed));
        metric!("tactical_swarm_agents_neutral", "Number of neutral agents", "gauge",
            self.agents_neutral.load(Ordering::Relaxed));
        metric!("tactical_swarm_agents_swarm", "Number of flocking swarm members", "gauge",
            self.agents_swarm.load(Ordering::Relaxed));

        // Performance
        metric!("tactical_swarm_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("tactical_swarm_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("tactical_swarm_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("tactical_swarm_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("tactical_swarm_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        // Tactical intent
        metric!("tactical_swarm_intent_requests_total", "Snapshots handed to the intent worker", "counter",
            self.intent_requests.load(Ordering::Relaxed));
        metric!("tactical_swarm_intent_responses_total", "Responses received from the intent worker", "counter",
            self.intent_responses.load(Ordering::Relaxed));
        metric!("tactical_swarm_intents_applied_total", "Agent intents replaced", "counter",
            self.intents_applied.load(Ordering::Relaxed));
        metric!("tactical_swarm_intents_unknown_total", "Response entries for unknown agents", "counter",
            self.intents_unknown.load(Ordering::Relaxed));
        metric!("tactical_swarm_intent_responses_stale_total", "Responses dropped for an outdated generation", "counter",
            self.intent_responses_stale.load(Ordering::Relaxed));
        metric!("tactical_swarm_intents_expired_total", "Intents cleared by the expiry policy", "counter",
            self.intents_expired.load(Ordering::Relaxed));
        metric!("tactical_swarm_intent_dispatches_skipped_total", "Due dispatches skipped while a request was in flight", "counter",
            self.intent_dispatches_skipped.load(Ordering::Relaxed));
        metric!("tactical_swarm_worker_connected", "Intent worker connected (0/1)", "gauge",
            self.worker_connected.load(Ordering::Relaxed));
        metric!("tactical_swarm_alerts_total", "Threat alerts fired", "counter",
            self.alerts_fired.load(Ordering::Relaxed));

        // Telemetry
        metric!("tactical_swarm_polarization", "Swarm polarization (0-1)", "gauge",
            self.polarization.load());
        metric!("tactical_swarm_milling", "Swarm milling about the centroid", "gauge",
            self.milling.load());
        metric!("tactical_swarm_cohesion", "Swarm cohesion (0-1)", "gauge",
            self.cohesion.load());
        metric!("tactical_swarm_steering_peak_force", "Largest steering force in the last flocking pass", "gauge",
            self.steering_peak_force.load());

        metric!("tactical_swarm_sim_time_seconds", "Simulation time since the last reset", "gauge",
            self.sim_time_seconds.load());
        metric!("tactical_swarm_generation", "Scenario generation", "gauge",
            self.generation.load(Ordering::Relaxed));
        metric!("tactical_swarm_uptime_seconds", "Process uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics (alternative for direct API access)
    pub fn to_json(&self) -> String {
        let value = serde_json::json!({
            "agents": {
                "hostile": self.agents_hostile.load(Ordering::Relaxed),
                "friendly": self.agents_friendly.load(Ordering::Relaxed),
                "neutral": self.agents_neutral.load(Ordering::Relaxed),
                "swarm": self.agents_swarm.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
            },
            "intent": {
                "requests": self.intent_requests.load(Ordering::Relaxed),
                "responses": self.intent_responses.load(Ordering::Relaxed),
                "applied": self.intents_applied.load(Ordering::Relaxed),
                "unknown": self.intents_unknown.load(Ordering::Relaxed),
                "stale": self.intent_responses_stale.load(Ordering::Relaxed),
                "expired": self.intents_expired.load(Ordering::Relaxed),
                "skipped": self.intent_dispatches_skipped.load(Ordering::Relaxed),
                "worker_connected": self.worker_connected.load(Ordering::Relaxed) == 1,
            },
            "telemetry": {
                "polarization": self.polarization.load(),
                "milling": self.milling.load(),
                "cohesion": self.cohesion.load(),
                "steering_peak_force": self.steering_peak_force.load(),
            },
            "simulation": {
                "sim_time_seconds": self.sim_time_seconds.load(),
                "generation": self.generation.load(Ordering::Relaxed),
                "alerts": self.alerts_fired.load(Ordering::Relaxed),
                "uptime_seconds": self.uptime_seconds(),
            },
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}

/// Build the HTTP response for a raw request
fn route(request: &str, metrics: &Metrics) -> String {
    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        http_response("application/json", &metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        http_response("text/plain; version=0.0.4", &metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        http_response("text/plain", "OK")
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = route(&request, &metrics);

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
