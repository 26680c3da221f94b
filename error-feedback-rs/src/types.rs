//! # Core Types
//!
//! The error taxonomy, the record and plan types shared by every stage of the
//! pipeline, and the crate's own `Error` for the few operations that are
//! allowed to fail.

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Free-form context supplied alongside a failure
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Category tag assigned to a failure by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    // API / network
    ApiError,
    NetworkError,
    RateLimitError,
    AuthenticationError,
    ServiceUnavailable,
    TimeoutError,

    // Validation / processing
    ValidationError,
    ProcessingError,
    ContentError,
    FormatError,

    // Storage / session
    DatabaseError,
    StorageError,
    SessionError,

    // Business
    TranscriptError,
    SummaryError,
    PermissionError,
    QuotaError,

    // System
    SystemError,
    ConfigurationError,
    DependencyError,
}

impl ErrorType {
    /// Every error type, in declaration order
    pub const ALL: [ErrorType; 20] = [
        ErrorType::ApiError,
        ErrorType::NetworkError,
        ErrorType::RateLimitError,
        ErrorType::AuthenticationError,
        ErrorType::ServiceUnavailable,
        ErrorType::TimeoutError,
        ErrorType::ValidationError,
        ErrorType::ProcessingError,
        ErrorType::ContentError,
        ErrorType::FormatError,
        ErrorType::DatabaseError,
        ErrorType::StorageError,
        ErrorType::SessionError,
        ErrorType::TranscriptError,
        ErrorType::SummaryError,
        ErrorType::PermissionError,
        ErrorType::QuotaError,
        ErrorType::SystemError,
        ErrorType::ConfigurationError,
        ErrorType::DependencyError,
    ];

    /// The wire name of this type, e.g. `RATE_LIMIT_ERROR`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ApiError => "API_ERROR",
            ErrorType::NetworkError => "NETWORK_ERROR",
            ErrorType::RateLimitError => "RATE_LIMIT_ERROR",
            ErrorType::AuthenticationError => "AUTHENTICATION_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorType::TimeoutError => "TIMEOUT_ERROR",
            ErrorType::ValidationError => "VALIDATION_ERROR",
            ErrorType::ProcessingError => "PROCESSING_ERROR",
            ErrorType::ContentError => "CONTENT_ERROR",
            ErrorType::FormatError => "FORMAT_ERROR",
            ErrorType::DatabaseError => "DATABASE_ERROR",
            ErrorType::StorageError => "STORAGE_ERROR",
            ErrorType::SessionError => "SESSION_ERROR",
            ErrorType::TranscriptError => "TRANSCRIPT_ERROR",
            ErrorType::SummaryError => "SUMMARY_ERROR",
            ErrorType::PermissionError => "PERMISSION_ERROR",
            ErrorType::QuotaError => "QUOTA_ERROR",
            ErrorType::SystemError => "SYSTEM_ERROR",
            ErrorType::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorType::DependencyError => "DEPENDENCY_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact tier, determined solely by the error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a caller is advised to respond to a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStrategy {
    Retry,
    Fallback,
    GracefulDegradation,
    UserActionRequired,
    SystemIntervention,
}

/// Growth of the delay between successive retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Exponential,
    Linear,
    Fixed,
}

/// A failure as reported by the surrounding service.
///
/// Every field is optional; the analyzer works with whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawError {
    /// Numeric status, usually an HTTP status from an upstream call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Symbolic code such as `ECONNREFUSED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error class name, e.g. `ValidationError`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RawError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a failure that only carries a message
    pub fn message<S: Into<String>>(message: S) -> Self {
        Self::new().with_message(message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code<S: Into<String>>(mut self, code: S) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builds a raw failure from any Rust error.
    ///
    /// The name is the last path segment of the error's type and the message
    /// is its `Display` output.
    pub fn from_error<E: StdError>(err: &E) -> Self {
        let type_name = std::any::type_name::<E>();
        let name = type_name.rsplit("::").next().unwrap_or(type_name);
        Self::new().with_name(name).with_message(err.to_string())
    }
}

impl From<&std::io::Error> for RawError {
    fn from(err: &std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let code = match err.kind() {
            Io::ConnectionRefused => Some("ECONNREFUSED"),
            Io::ConnectionReset => Some("ECONNRESET"),
            Io::TimedOut => Some("ETIMEDOUT"),
            _ => None,
        };

        let raw = RawError::from_error(err);
        match code {
            Some(code) => raw.with_code(code),
            None => raw,
        }
    }
}

/// A classified failure as stored in the error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub severity: Severity,
    pub retryable: bool,
    pub component: String,
    pub operation: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub transcript_id: Option<String>,
    pub message: String,
    /// Context after sanitization
    pub context: ContextMap,
}

/// Advisory describing how a caller should respond to a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPlan {
    pub strategy: RecoveryStrategy,
    /// Suggested wait before acting, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffKind>,
    #[serde(default)]
    pub fallback_options: Vec<String>,
    #[serde(default)]
    pub degradation_options: Vec<String>,
    #[serde(default)]
    pub required_actions: Vec<String>,
    #[serde(default)]
    pub intervention_required: bool,
    #[serde(default)]
    pub validation_rules: Vec<String>,
}

impl RecoveryPlan {
    pub fn new(strategy: RecoveryStrategy) -> Self {
        Self {
            strategy,
            delay: None,
            max_retries: None,
            backoff: None,
            fallback_options: Vec::new(),
            degradation_options: Vec::new(),
            required_actions: Vec::new(),
            intervention_required: false,
            validation_rules: Vec::new(),
        }
    }

    pub fn delay(mut self, millis: u64) -> Self {
        self.delay = Some(millis);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = Some(backoff);
        self
    }

    pub fn fallback_options(mut self, options: &[&str]) -> Self {
        self.fallback_options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn degradation_options(mut self, options: &[&str]) -> Self {
        self.degradation_options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    pub fn required_actions(mut self, actions: &[&str]) -> Self {
        self.required_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn intervention_required(mut self) -> Self {
        self.intervention_required = true;
        self
    }
}

/// Kind of anomaly raised by the pattern detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HighFrequency,
    ComponentSpecific,
}

/// An anomaly signal raised when recent failures cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub description: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub recommendation: String,
}

/// Categorizes failures of the pipeline itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration
    Configuration,
    /// Input/output error
    IO,
    /// Error serializing or deserializing records
    Serialization,
    /// A user-triggered export failed
    Export,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::IO => write!(f, "I/O Error"),
            ErrorKind::Serialization => write!(f, "Serialization Error"),
            ErrorKind::Export => write!(f, "Export Error"),
        }
    }
}

/// Error returned by the fallible operations of this crate
#[derive(Debug)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// The time when the error occurred
    pub timestamp: DateTime<Utc>,
    /// Underlying cause, if any
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            cause: None,
        }
    }

    /// Chains this error with its cause
    pub fn cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Re-tags an error, keeping its message and cause
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::IO, err.to_string()).cause(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Serialization, format!("JSON error: {}", err)).cause(err)
    }
}
