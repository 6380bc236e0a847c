use stage_core::Dispatched;
use stage_io::metrics::{init_metrics, observe_dispatch, serve_metrics};
use std::thread;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

pub fn record(dispatched: &Dispatched) {
    observe_dispatch(dispatched);
}
