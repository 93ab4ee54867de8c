//! File-based logging.
//!
//! The terminal belongs to the dashboard, so log lines go to a daily
//! rolling file under the configured directory instead of stdout.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "btc-pulse.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter`.  The returned guard flushes the
/// background writer when dropped, so `main` must keep it alive.
pub fn init(log_dir: &Path, default_filter: &str) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = build_filter(default_filter)?;

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!(log_dir = %log_dir.display(), filter = default_filter, "logging initialised");
    Ok(guard)
}

/// `RUST_LOG` if set and valid, otherwise `default_filter`, which must parse.
fn build_filter(default_filter: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter {default_filter:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_is_accepted() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(build_filter("btc_pulse=debug,warn").is_ok());
    }

    #[test]
    fn malformed_filter_is_an_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = build_filter("btc_pulse=loud").unwrap_err();
        assert!(err.to_string().contains("invalid log filter"), "{err:#}");
    }
}
