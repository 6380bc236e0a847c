pub mod bridge;
pub mod metrics;

pub use bridge::{BridgeConfig, BridgeError, SerialBridge};
pub use metrics::{init_metrics, observe_dispatch, serve_metrics};
