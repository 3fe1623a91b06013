use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,instruction_writer=debug";

/// Initializes logging for the driver.
///
/// - Console: compact human-readable output on stderr (stdout carries cleanup
///   records)
/// - File: optional JSON output in `log_dir`, rotated daily
///
/// `RUST_LOG` overrides the default filter, e.g.
/// `RUST_LOG=instruction_writer=trace mako-instruction-writer`.
///
/// Returns a guard that must be kept alive for the duration of the program when
/// file logging is enabled. Dropping it stops file logging.
pub fn init_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let mut guard = None;
    let file_layer = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, dir, "instruction-writer.log");
                let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                guard = Some(worker_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_file(true)
                        .with_line_number(true)
                        .boxed(),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to create log directory at {}: {}",
                    dir.display(),
                    e
                );
                eprintln!("Logs will only be written to console.");
                None
            }
        },
        None => None,
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
