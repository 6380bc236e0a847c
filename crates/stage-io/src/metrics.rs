//! Prometheus metrics for the stage controller.
//!
//! Counters follow the dispatcher's view of the serial link; gauges mirror
//! the last motion snapshot.

use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use stage_core::{tags, Axis, Command, Dispatched};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Serial Link Metrics
// ============================================================================

/// Raw bytes received from the serial client
pub static RX_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("stage_rx_bytes_total", "Bytes received on the serial link").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static TRUNCATED_BYTES: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::TRUNCATED_BYTES.metric,
        "Bytes dropped because a line exceeded the buffer",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static BUSY_DROPS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::BUSY_DROPS.metric,
        "Bytes dropped because the previous line was still pending",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static ECHO_DROPS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::ECHO_DROPS.metric,
        "Echo bytes dropped because the transmitter was not ready",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Serial bridge listening (1) or stopped (0)
pub static BRIDGE_LISTENING: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new("stage_bridge_listening", "Serial bridge listening (1) or stopped (0)").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Serial client connection status (1 = connected, 0 = disconnected)
pub static BRIDGE_CONNECTED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(
        "stage_bridge_connected",
        "Serial client connection status (1=connected, 0=disconnected)",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Dispatch Metrics
// ============================================================================

pub static LINES_CONSUMED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(tags::LINES_CONSUMED.metric, "Lines consumed by the dispatcher").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static LINES_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        tags::LINES_IGNORED.metric,
        "Lines that matched no command and were discarded",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Applied commands, labelled by kind
pub static COMMANDS_APPLIED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(tags::COMMANDS_APPLIED.metric, "Commands applied, by kind"),
        &["kind"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Output State Metrics
// ============================================================================

pub static SPINDLE_LEVEL: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::SPINDLE_LEVEL.metric, "Commanded spindle level (0-255)").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub static SPINDLE_ENABLED: LazyLock<Gauge> = LazyLock::new(|| {
    let gauge = Gauge::new(tags::SPINDLE_ENABLED.metric, "Spindle output enabled (1) or off (0)").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub static AXIS_STEP: LazyLock<GaugeVec> = LazyLock::new(|| {
    let gauge = GaugeVec::new(
        Opts::new(tags::AXIS_STEP.metric, "Step pin level per axis"),
        &["axis"],
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub static AXIS_DIR: LazyLock<GaugeVec> = LazyLock::new(|| {
    let gauge = GaugeVec::new(
        Opts::new(tags::AXIS_DIR.metric, "Direction pin level per axis"),
        &["axis"],
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

fn level(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Folds one dispatched line into the metrics.
pub fn observe_dispatch(dispatched: &Dispatched) {
    LINES_CONSUMED.inc();
    match dispatched.command {
        Command::Unrecognized => LINES_IGNORED.inc(),
        command => COMMANDS_APPLIED.with_label_values(&[command.kind()]).inc(),
    }
    TRUNCATED_BYTES.inc_by(u64::from(dispatched.truncated));
    BUSY_DROPS.inc_by(u64::from(dispatched.busy_drops));
    ECHO_DROPS.inc_by(u64::from(dispatched.echo_drops));

    let snap = &dispatched.snapshot;
    for (axis, state) in [(Axis::X, snap.x), (Axis::Y, snap.y), (Axis::Z, snap.z)] {
        AXIS_STEP.with_label_values(&[axis.as_str()]).set(level(state.step));
        AXIS_DIR.with_label_values(&[axis.as_str()]).set(level(state.dir));
    }
    SPINDLE_LEVEL.set(f64::from(snap.spindle.level));
    SPINDLE_ENABLED.set(level(snap.spindle.enabled));
}

/// Encodes the registry in the Prometheus text format.
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let buffer = match render() {
                        Ok(buffer) => buffer,
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            let _ = request.respond(
                                Response::from_string("Internal Server Error").with_status_code(500),
                            );
                            continue;
                        }
                    };
                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/plain; version=0.0.4"[..],
                    ) {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the serial bridge accepts clients
                    if BRIDGE_LISTENING.get() > 0.0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = RX_BYTES.get();
    let _ = TRUNCATED_BYTES.get();
    let _ = BUSY_DROPS.get();
    let _ = ECHO_DROPS.get();
    let _ = BRIDGE_LISTENING.get();
    let _ = BRIDGE_CONNECTED.get();
    let _ = LINES_CONSUMED.get();
    let _ = LINES_IGNORED.get();
    let _ = COMMANDS_APPLIED.with_label_values(&["step_x"]).get();
    let _ = SPINDLE_LEVEL.get();
    let _ = SPINDLE_ENABLED.get();
    for axis in Axis::ALL {
        let _ = AXIS_STEP.with_label_values(&[axis.as_str()]).get();
        let _ = AXIS_DIR.with_label_values(&[axis.as_str()]).get();
    }
}
