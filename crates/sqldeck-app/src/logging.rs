//! Logging and tracing setup for SQLDeck
//!
//! Pretty console output for development and a daily rolling JSON file for
//! bug reports. `RUST_LOG` overrides the configured filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,

    /// JSON output to a daily rolling file
    pub enable_json_logs: bool,

    pub enable_console_logs: bool,

    /// Include file/line information
    pub include_location: bool,

    /// Log span creation and close (async operation timing)
    pub enable_spans: bool,

    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            enable_spans: cfg!(debug_assertions),
            default_filter: "info,sqldeck_app=debug,sqldeck_core=debug,sqldeck_connection=debug,sqldeck_navigation_tabs=debug,sqldeck_sql_editor=debug,sqldeck_sql_editor_tabs=debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// JSON file only, quieter filter
    pub fn production() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: false,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,sqldeck_app=info,sqldeck_connection=info,sqldeck_sql_editor=info,sqldeck_sql_editor_tabs=info".to_string(),
        }
    }

    pub fn development() -> Self {
        Self::default()
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW/CLOSE only: ENTER would fire on every re-poll of an awaited future
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "sqldeck.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "Logging system initialized"
    );

    Ok(guard)
}

/// Development config in debug builds, production otherwise
pub fn init_default() -> anyhow::Result<Option<WorkerGuard>> {
    let config = if cfg!(debug_assertions) {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };

    init(config)
}

pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqldeck")
        .join("logs")
}
