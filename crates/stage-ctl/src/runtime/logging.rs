use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,stage_ctl=debug,stage_io=debug,stage_core=debug";

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Initialize the tracing subscriber with optional JSON output.
///
/// With a `log_dir`, records are also written as JSON to a daily rolling
/// file. The returned guard flushes that file and must outlive the run.
/// Records from the `log` facade are forwarded into the same subscriber.
pub fn init_tracing(json_output: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (subscriber, guard) = build_subscriber(json_output, log_dir, filter);
    subscriber.init();
    guard
}

fn build_subscriber(
    json_output: bool,
    log_dir: Option<&Path>,
    filter: EnvFilter,
) -> (BoxedSubscriber, Option<WorkerGuard>) {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "stage-ctl.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // The file layer sits directly on the filter so both stdout formats share it.
    let base = tracing_subscriber::registry().with(filter).with(file_layer);
    let subscriber: BoxedSubscriber = if json_output {
        Box::new(base.with(fmt::layer().json()))
    } else {
        Box::new(base.with(fmt::layer().pretty()))
    };

    (subscriber, guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file_contents(dir: &Path) -> String {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect()
    }

    #[test]
    fn log_dir_receives_json_records_in_both_formats() {
        let dir = tempdir().unwrap();

        for json_output in [false, true] {
            let (subscriber, guard) =
                build_subscriber(json_output, Some(dir.path()), EnvFilter::new("info"));
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(json_output, "rolling file record");
            });
            // Dropping the guard flushes the non-blocking writer.
            drop(guard);
        }

        let contents = file_contents(dir.path());
        let records: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record["fields"]["message"], "rolling file record");
        }
    }

    #[test]
    fn no_guard_without_log_dir() {
        let (_subscriber, guard) = build_subscriber(false, None, EnvFilter::new("info"));
        assert!(guard.is_none());
    }
}
