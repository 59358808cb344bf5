// src/utils/logging.rs
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::config::NodeConfig;
use crate::utils::error::{DoorError, Result};

/// Installs the global tracing subscriber for a host process.
///
/// `RUST_LOG` takes precedence over `node.log_level`. When `node.log_dir` is
/// set, events are also written to a daily rolling file; keep the returned
/// guard alive for as long as the file should be flushed.
pub fn init_logging(node: &NodeConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&node.log_level))
        .map_err(|e| DoorError::Config(format!("Invalid log level: {}", e)))?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    match &node.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "doorguard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| DoorError::Config(format!("Logging already initialized: {}", e)))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .try_init()
                .map_err(|e| DoorError::Config(format!("Logging already initialized: {}", e)))?;
            Ok(None)
        }
    }
}
