//! # Structured Logging
//!
//! Operator-facing logging. Every handled error is emitted as one structured
//! `tracing` event; `init_logging` installs a subscriber for binaries and
//! services that do not bring their own.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::types::{Error, ErrorKind, ErrorRecord, Pattern, Result, Severity};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the operator log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// The service name for identification
    pub service_name: String,
    /// Whether to also write the operator log to a daily file
    pub file_output: bool,
    /// The directory to store operator log files in
    pub log_dir: Option<String>,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "error-feedback".to_string(),
            file_output: false,
            log_dir: None,
            json_format: true,
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = Registry::default().with(filter);

    // JSON and text layers have different concrete types, so each branch
    // finishes building its own subscriber.
    let result = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true);
        let subscriber = subscriber.with(json_layer);
        let file = file_layer(&config);
        tracing::subscriber::set_global_default(subscriber.with(file))
    } else {
        let text_layer = fmt::layer().with_target(true).with_thread_names(true);
        let subscriber = subscriber.with(text_layer);
        let file = file_layer(&config);
        tracing::subscriber::set_global_default(subscriber.with(file))
    };

    result.map_err(|e| {
        Error::new(
            ErrorKind::Configuration,
            format!("Failed to set global subscriber: {}", e),
        )
    })?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    info!(
        service = %config.service_name,
        level = %config.level,
        json = %config.json_format,
        "Structured logging initialized"
    );

    Ok(())
}

fn file_layer<S>(config: &LoggingConfig) -> Option<fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, NonBlocking>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if !config.file_output {
        return None;
    }
    let log_dir = config.log_dir.as_ref()?;

    let file_appender = RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        log_dir,
        format!("{}.log", config.service_name),
    );
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    // Keep the guard alive for the lifetime of the program so buffered lines
    // are flushed
    Box::leak(Box::new(guard));

    Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
}

/// Logs a handled error at a level derived from its severity
pub fn log_handled_error(record: &ErrorRecord) {
    match record.severity {
        Severity::Critical | Severity::High => {
            error!(
                error_id = %record.id,
                error_type = %record.error_type,
                severity = %record.severity,
                component = %record.component,
                operation = %record.operation,
                user_id = %record.user_id,
                retryable = record.retryable,
                message = %record.message,
                context = ?record.context,
                "Error handled"
            );
        }
        Severity::Medium => {
            warn!(
                error_id = %record.id,
                error_type = %record.error_type,
                severity = %record.severity,
                component = %record.component,
                operation = %record.operation,
                retryable = record.retryable,
                message = %record.message,
                "Error handled"
            );
        }
        Severity::Low => {
            info!(
                error_id = %record.id,
                error_type = %record.error_type,
                severity = %record.severity,
                component = %record.component,
                operation = %record.operation,
                message = %record.message,
                "Error handled"
            );
        }
    }
}

pub fn log_pattern(record: &ErrorRecord, pattern: &Pattern) {
    warn!(
        error_id = %record.id,
        pattern = ?pattern.kind,
        count = pattern.count,
        recommendation = %pattern.recommendation,
        "{}",
        pattern.description
    );
}
