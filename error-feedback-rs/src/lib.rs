//! # Error Feedback Pipeline
//!
//! Centralized error classification, logging and user feedback for a backend
//! service. Failures are classified into a fixed taxonomy, sanitized, logged
//! to a bounded in-memory log mirrored to daily files, scanned for anomalies
//! and rendered into consistent responses for end users.
//!
//! ## Features
//!
//! - Ordered, data-driven classification rules
//! - Severity, retryability and recovery plans per error type
//! - Context sanitization before anything is stored
//! - Bounded log with a best-effort durable sink
//! - Time-windowed statistics and JSON/CSV export
//! - Frequency and component pattern detection
//!
//! ```no_run
//! use std::sync::Arc;
//! use error_feedback_rs::{ContextMap, ErrorHandler, HandlerConfig, RawError, UserFeedbackSystem};
//!
//! let handler = Arc::new(ErrorHandler::new(HandlerConfig::default().log_dir("logs")).unwrap());
//! let feedback = UserFeedbackSystem::new(Arc::clone(&handler));
//!
//! let response = feedback.generate_error_response(
//!     &RawError::new().with_status(429),
//!     &ContextMap::new(),
//! );
//! println!("{}", response.user_message.title);
//! ```

pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod error_log;
pub mod export;
pub mod feedback;
pub mod handler;
pub mod logging;
pub mod monitoring;
pub mod patterns;
pub mod recovery;
pub mod sanitization;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use analyzer::{ClassificationRule, ErrorAnalyzer, Matcher};
pub use config::{ConfigError, HandlerConfig};
pub use error_log::{generate_error_id, ErrorLog, FileSink, LogSink, NullSink};
pub use export::ExportFormat;
pub use feedback::{FeedbackAction, FeedbackResponse, UserFeedbackSystem};
pub use handler::{ErrorHandler, HandledError};
pub use logging::{init_logging, LoggingConfig};
pub use patterns::{PatternConfig, PatternDetector};
pub use recovery::RecoveryPlanner;
pub use sanitization::sanitize_context;
pub use stats::{parse_time_window, ErrorStats};
pub use types::{
    ContextMap, Error, ErrorKind, ErrorRecord, ErrorType, Pattern, PatternKind, RawError,
    RecoveryPlan, RecoveryStrategy, Result, Severity,
};

/// Initializes operator logging and builds a handler from the environment
pub fn init() -> Result<ErrorHandler> {
    init_logging(None)?;
    let config = HandlerConfig::from_env()?;
    ErrorHandler::new(config)
}
