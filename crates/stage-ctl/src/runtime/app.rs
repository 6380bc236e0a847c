use crate::infra::journal::{Journal, JournalError, JournalEventType};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use stage_core::{
    DispatchStats, Dispatched, Dispatcher, LineExchange, LineReceiver, ParkIdle, SimulatedStage,
};
use stage_io::{BridgeConfig, BridgeError, SerialBridge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub fn run_from_args() -> Result<(), AppError> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config).inspect_err(|err| error!(error = %err, "stage-ctl stopped with an error"))
}

pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref());

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let journal = match config.journal_path.as_deref() {
        Some(path) => {
            info!(path = %path.display(), "Journal enabled");
            Some(Arc::new(Journal::open(path)?))
        }
        None => None,
    };

    if let Some(ref journal) = journal {
        journal.record(
            JournalEventType::SystemStart,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "bind_addr": config.bind_addr,
                "metrics_enabled": config.metrics_addr.is_some(),
            }),
        )?;
    }

    // Bind before any thread starts so a busy port fails the run cleanly.
    let bridge = SerialBridge::bind(BridgeConfig {
        bind_addr: config.bind_addr.clone(),
        tx_capacity: config.tx_capacity,
        ..BridgeConfig::default()
    })?;

    let (producer, consumer) = LineExchange::new_pair();
    let stop = Arc::new(AtomicBool::new(false));

    info!(
        idle_ms = config.idle_timeout.as_millis() as u64,
        "Starting dispatcher"
    );

    let stop_dispatch = Arc::clone(&stop);
    let journal_dispatch = journal.clone();
    let idle_timeout = config.idle_timeout;
    let dispatch_handle = thread::Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || {
            let mut dispatcher = Dispatcher::new(SimulatedStage::new(), consumer);
            let mut idle = ParkIdle::new(idle_timeout);
            let mut observer = |dispatched: &Dispatched, stats: &DispatchStats| {
                debug!(
                    command = %dispatched.command,
                    lines = stats.lines_consumed,
                    spindle_level = dispatched.snapshot.spindle.level,
                    "Line dispatched"
                );
                telemetry::record(dispatched);
                if let Some(ref journal) = journal_dispatch {
                    if let Err(err) = journal.record_dispatch(dispatched) {
                        warn!(error = %err, "Journal write failed");
                    }
                }
            };
            dispatcher.run(&mut idle, &mut observer, &stop_dispatch);
            dispatcher.stats().clone()
        })?;

    let bridge_handle = bridge.spawn(
        LineReceiver::new(producer),
        dispatch_handle.thread().clone(),
        Arc::clone(&stop),
    );

    info!("stage-ctl running. Connect a terminal to the bridge to send commands.");

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        thread::sleep(Duration::from_secs(seconds));
        stop.store(true, Ordering::Relaxed);
        dispatch_handle.thread().unpark();
    }

    let stats = dispatch_handle
        .join()
        .map_err(|_| AppError::ThreadPanicked("dispatcher"))?;
    bridge_handle
        .join()
        .map_err(|_| AppError::ThreadPanicked("bridge"))?;

    info!(
        lines_consumed = stats.lines_consumed,
        commands_applied = stats.commands_applied,
        lines_ignored = stats.lines_ignored,
        truncated_bytes = stats.truncated_bytes,
        busy_drops = stats.busy_drops,
        echo_drops = stats.echo_drops,
        "Run complete"
    );

    if let Some(ref journal) = journal {
        journal.record(
            JournalEventType::SystemShutdown,
            serde_json::to_value(&stats).map_err(JournalError::from)?,
        )?;
    }

    Ok(())
}
