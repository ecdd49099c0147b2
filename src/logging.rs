//! Logging setup
//!
//! `RUST_LOG` wins over the configured level. When a log directory is set,
//! output is also written to a daily rolling file through a non-blocking
//! writer; keep the returned guard alive until shutdown so it gets flushed.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_PREFIX: &str = "hisoka.log";

/// Build the filter from `RUST_LOG`, falling back to `level`
pub fn env_filter(level: &str) -> EnvFilter {
    filter_or_level(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), level)
}

/// Use `directives` when present and valid, `level` otherwise
fn filter_or_level(directives: Option<&str>, level: &str) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_falls_back_to_level() {
        assert!(filter_or_level(None, "debug").to_string().contains("debug"));
        assert!(filter_or_level(Some("  "), "debug").to_string().contains("debug"));
    }

    #[test]
    fn test_filter_prefers_env_directives() {
        let filter = filter_or_level(Some("hisoka=trace,warn"), "debug").to_string();
        assert!(filter.contains("hisoka=trace"));
        assert!(filter.contains("warn"));
        assert!(!filter.contains("debug"));
    }

    #[test]
    fn test_invalid_env_directives_fall_back() {
        let filter = filter_or_level(Some("hisoka=loud"), "info").to_string();
        assert!(filter.contains("info"));
        assert!(!filter.contains("hisoka"));
    }
}
