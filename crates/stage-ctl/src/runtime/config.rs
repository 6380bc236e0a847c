use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub bind_addr: String,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub journal_path: Option<PathBuf>,
    pub idle_timeout: Duration,
    pub tx_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            bind_addr: "127.0.0.1:7100".to_string(),
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            journal_path: None,
            idle_timeout: Duration::from_millis(10),
            tx_capacity: 32,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    /// Unparseable values keep their defaults.
    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-seconds" => {
                    if i + 1 < args.len() {
                        cfg.run_seconds = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        cfg.bind_addr = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    if i + 1 < args.len() {
                        cfg.log_dir = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--metrics-addr" => {
                    if i + 1 < args.len() {
                        cfg.metrics_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--journal" => {
                    if i + 1 < args.len() {
                        cfg.journal_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--idle-ms" => {
                    if i + 1 < args.len() {
                        if let Ok(ms) = args[i + 1].parse::<u64>() {
                            cfg.idle_timeout = Duration::from_millis(ms.max(1));
                        }
                        i += 1;
                    }
                }
                "--tx-capacity" => {
                    if i + 1 < args.len() {
                        if let Ok(n) = args[i + 1].parse::<usize>() {
                            cfg.tx_capacity = n;
                        }
                        i += 1;
                    }
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"stage-ctl - serial line-command controller for a three-axis stage

USAGE:
    stage-ctl [OPTIONS]

OPTIONS:
    --bind <ADDR>           Serial-over-TCP bind address [default: 127.0.0.1:7100]
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format (for log aggregation)
    --log-dir <PATH>        Also write JSON logs to a daily rolling file in PATH
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --journal <PATH>        Append every consumed line to a JSONL journal
    --idle-ms <MS>          Longest idle wait between output refreshes [default: 10]
    --tx-capacity <N>       Echo bytes the UART transmitter accepts per interrupt [default: 32]
    -h, --help              Print this help message

LINE COMMANDS:
    a|d <n>   toggle X step|dir         w|s <n>   toggle Y step|dir
    z|x <n>   toggle Z step|dir         on <0-255>   spindle on at level
    off       spindle off

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,stage_core=trace)

EXAMPLES:
    # Basic run with metrics
    stage-ctl --metrics-addr 0.0.0.0:9090

    # Drive it from a terminal
    nc 127.0.0.1 7100
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("stage-ctl")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_flags() {
        let cfg = RuntimeConfig::from_args(&args(&[]));
        assert_eq!(cfg.bind_addr, "127.0.0.1:7100");
        assert_eq!(cfg.idle_timeout, Duration::from_millis(10));
        assert_eq!(cfg.tx_capacity, 32);
        assert!(cfg.journal_path.is_none());
        assert!(!cfg.show_help);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--bind",
            "0.0.0.0:9000",
            "--run-seconds",
            "3",
            "--journal",
            "/tmp/stage.jsonl",
            "--idle-ms",
            "25",
            "--tx-capacity",
            "4",
            "--json-logs",
        ]));
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.run_seconds, Some(3));
        assert_eq!(cfg.journal_path, Some(PathBuf::from("/tmp/stage.jsonl")));
        assert_eq!(cfg.idle_timeout, Duration::from_millis(25));
        assert_eq!(cfg.tx_capacity, 4);
        assert!(cfg.json_logs);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let cfg = RuntimeConfig::from_args(&args(&["--idle-ms", "soon", "--tx-capacity", "-1"]));
        assert_eq!(cfg.idle_timeout, Duration::from_millis(10));
        assert_eq!(cfg.tx_capacity, 32);
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["-h", "--bind", "1.2.3.4:5"]));
        assert!(cfg.show_help);
        assert_eq!(cfg.bind_addr, "127.0.0.1:7100");
    }
}
