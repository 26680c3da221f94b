//! # Error Handler
//!
//! The facade that runs a failure through the whole pipeline:
//! analysis and sanitization, recovery planning, log append, counters and
//! pattern detection. `handle_error` never fails; stage failures are reported
//! on the operator channel and the pipeline continues with what it has.
//!
//! The log, counters and last-error map share one mutex, so appends are
//! linearizable and detection and statistics always scan a consistent
//! snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyzer::ErrorAnalyzer;
use crate::catalog;
use crate::config::HandlerConfig;
use crate::error_log::{ErrorLog, FileSink, LogSink, NullSink};
use crate::export::{export_records, ExportFormat};
use crate::logging;
use crate::monitoring;
use crate::patterns::PatternDetector;
use crate::recovery::RecoveryPlanner;
use crate::stats::{compute_stats, ErrorStats};
use crate::types::{
    ContextMap, Error, ErrorKind, ErrorRecord, ErrorType, Pattern, RawError, RecoveryPlan, Result,
    Severity,
};

/// Structured result of handling one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandledError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub severity: Severity,
    pub message: String,
    /// Catalog title for the error type
    pub title: String,
    pub details: String,
    pub suggestions: Vec<String>,
    pub recovery_plan: RecoveryPlan,
    pub pattern: Option<Pattern>,
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub retryable: bool,
    pub sanitized_context: ContextMap,
    /// Component and operation from the context, kept for feedback rendering
    pub component: String,
    pub operation: String,
}

#[derive(Debug, Default)]
struct HandlerState {
    log: ErrorLog,
    /// Keyed by `TYPE:component`
    counters: HashMap<String, u64>,
    last_by_type: HashMap<ErrorType, ErrorRecord>,
}

pub struct ErrorHandler {
    config: HandlerConfig,
    analyzer: ErrorAnalyzer,
    planner: RecoveryPlanner,
    detector: PatternDetector,
    state: Mutex<HandlerState>,
    sink: Box<dyn LogSink>,
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("config", &self.config)
            .field("log_len", &self.lock_state().log.len())
            .finish()
    }
}

impl ErrorHandler {
    /// Creates a handler; a file sink is started when `log_dir` is set
    pub fn new(config: HandlerConfig) -> Result<Self> {
        let sink: Box<dyn LogSink> = match &config.log_dir {
            Some(dir) => Box::new(FileSink::new(dir.clone())?),
            None => Box::new(NullSink),
        };
        Self::with_sink(config, sink)
    }

    /// Creates a handler writing durable copies to `sink`
    pub fn with_sink(config: HandlerConfig, sink: Box<dyn LogSink>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            analyzer: ErrorAnalyzer::new(),
            planner: RecoveryPlanner::new(),
            detector: PatternDetector::new(config.pattern_config()),
            state: Mutex::new(HandlerState {
                log: ErrorLog::new(config.max_log_size),
                ..Default::default()
            }),
            sink,
            config,
        })
    }

    /// Replaces the classifier, e.g. one with extra rules
    pub fn with_analyzer(mut self, analyzer: ErrorAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    // A panic while holding the lock cannot leave the state half-updated in a
    // way readers care about, so poisoning is ignored.
    fn lock_state(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `error` through the pipeline. Never fails.
    ///
    /// `context` is only read; the stored and returned copies are sanitized.
    pub fn handle_error(&self, error: &RawError, context: &ContextMap) -> HandledError {
        let record = self.analyzer.analyze(error, context);
        let recovery_plan = self.planner.plan(&record, context);
        let message = catalog::user_message(record.error_type);

        let (pattern, log_len) = {
            let mut state = self.lock_state();
            let evicted = state.log.append(record.clone());
            if evicted > 0 {
                debug!(evicted, capacity = state.log.capacity(), "Evicted oldest error records");
            }

            let key = format!("{}:{}", record.error_type, record.component);
            *state.counters.entry(key).or_insert(0) += 1;
            state.last_by_type.insert(record.error_type, record.clone());

            let pattern = self.detector.detect(&record, state.log.records(), Utc::now());
            (pattern, state.log.len())
        };

        // Queued outside the lock; the sink reports its own failures
        self.sink.write(&record);

        logging::log_handled_error(&record);
        monitoring::record_handled_error(&record);
        monitoring::record_log_size(log_len);
        if let Some(pattern) = &pattern {
            logging::log_pattern(&record, pattern);
            monitoring::record_pattern(pattern);
        }

        HandledError {
            error_type: record.error_type,
            severity: record.severity,
            message: record.message,
            title: message.title,
            details: message.details,
            suggestions: message.suggestions,
            recovery_plan,
            pattern,
            error_id: record.id,
            timestamp: record.timestamp,
            retryable: record.retryable,
            sanitized_context: record.context,
            component: record.component,
            operation: record.operation,
        }
    }

    /// Statistics over the trailing `window`, e.g. `"24h"`
    pub fn get_stats(&self, window: &str) -> ErrorStats {
        let state = self.lock_state();
        compute_stats(state.log.records(), window, Utc::now())
    }

    /// Writes the in-memory log to a timestamped file under `log_dir`
    pub fn export_logs(&self, format: &str) -> Result<PathBuf> {
        let format: ExportFormat = format.parse()?;
        let dir = self.config.log_dir.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Export, "No log directory configured for export")
        })?;

        let records: Vec<ErrorRecord> = self.lock_state().log.iter().cloned().collect();
        let path = export_records(&records, format, dir, Utc::now())?;

        debug!(path = %path.display(), records = records.len(), %format, "Exported error log");
        Ok(path)
    }

    /// The last `limit` records, oldest first
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        let state = self.lock_state();
        let skip = state.log.len().saturating_sub(limit);
        state.log.iter().skip(skip).cloned().collect()
    }

    pub fn errors_by_severity(&self, severity: Severity) -> Vec<ErrorRecord> {
        self.lock_state()
            .log
            .iter()
            .filter(|r| r.severity == severity)
            .cloned()
            .collect()
    }

    pub fn errors_by_type(&self, error_type: ErrorType) -> Vec<ErrorRecord> {
        self.lock_state()
            .log
            .iter()
            .filter(|r| r.error_type == error_type)
            .cloned()
            .collect()
    }

    /// The most recent record of `error_type`, even if evicted from the log
    pub fn last_error(&self, error_type: ErrorType) -> Option<ErrorRecord> {
        self.lock_state().last_by_type.get(&error_type).cloned()
    }

    /// Per `TYPE:component` counts since creation or the last `clear`
    pub fn counters(&self) -> HashMap<String, u64> {
        self.lock_state().counters.clone()
    }

    pub fn log_len(&self) -> usize {
        self.lock_state().log.len()
    }

    /// Empties the log and resets counters in one step
    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.log.clear();
        state.counters.clear();
        state.last_by_type.clear();
        monitoring::record_log_size(0);
    }

    /// Blocks until the durable sink has written everything queued so far
    pub fn flush(&self) {
        self.sink.flush();
    }
}
