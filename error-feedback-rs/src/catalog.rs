//! # Error Catalog
//!
//! Static taxonomy tables: severity and retryability membership, user-facing
//! message templates and recovery-plan templates. Every lookup is total; types
//! without a dedicated entry receive the default entry.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::types::{BackoffKind, ErrorType, RecoveryPlan, RecoveryStrategy, Severity};

const CRITICAL_TYPES: &[ErrorType] = &[
    ErrorType::DatabaseError,
    ErrorType::ConfigurationError,
    ErrorType::AuthenticationError,
];

const HIGH_TYPES: &[ErrorType] = &[
    ErrorType::ServiceUnavailable,
    ErrorType::ProcessingError,
    ErrorType::SystemError,
];

const MEDIUM_TYPES: &[ErrorType] = &[
    ErrorType::ApiError,
    ErrorType::NetworkError,
    ErrorType::TimeoutError,
    ErrorType::RateLimitError,
];

const RETRYABLE_TYPES: &[ErrorType] = &[
    ErrorType::NetworkError,
    ErrorType::TimeoutError,
    ErrorType::RateLimitError,
    ErrorType::ServiceUnavailable,
];

/// Delay attached to the default recovery plan, in milliseconds
pub const DEFAULT_RECOVERY_DELAY_MS: u64 = 5000;

/// Severity and retryability of an error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub severity: Severity,
    pub retryable: bool,
}

/// User-facing message template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub title: String,
    pub details: String,
    pub suggestions: Vec<String>,
}

impl UserMessage {
    fn new(title: &str, details: &str, suggestions: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            details: details.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

static USER_MESSAGES: Lazy<HashMap<ErrorType, UserMessage>> = Lazy::new(|| {
    use ErrorType::*;

    HashMap::from([
        (ApiError, UserMessage::new(
            "External service error",
            "A service we depend on returned an error while handling your request.",
            &["Try again in a few moments", "Check the service status page"],
        )),
        (NetworkError, UserMessage::new(
            "Connection problem",
            "We could not reach a required service.",
            &["Check your internet connection", "Try again in a few moments"],
        )),
        (RateLimitError, UserMessage::new(
            "Too many requests",
            "You have sent too many requests in a short period.",
            &["Wait a minute before trying again", "Reduce how often you submit requests"],
        )),
        (AuthenticationError, UserMessage::new(
            "Authentication failed",
            "Your credentials could not be verified.",
            &["Sign in again", "Check that your API credentials are configured correctly"],
        )),
        (ServiceUnavailable, UserMessage::new(
            "Service temporarily unavailable",
            "The service is currently unavailable or under heavy load.",
            &["Try again in a few minutes", "Check the service status page"],
        )),
        (TimeoutError, UserMessage::new(
            "Request timed out",
            "The operation took too long to complete.",
            &["Try again", "Try with a shorter transcript"],
        )),
        (ValidationError, UserMessage::new(
            "Invalid input",
            "Some of the information provided is not valid.",
            &["Review the highlighted fields", "Make sure all required fields are filled in"],
        )),
        (ProcessingError, UserMessage::new(
            "Processing failed",
            "We could not finish processing your request.",
            &["Try again", "Try with different content", "Contact support if the problem persists"],
        )),
        (ContentError, UserMessage::new(
            "Content problem",
            "The submitted content is empty or could not be used.",
            &["Make sure the content is not empty", "Check that the content is in a supported format"],
        )),
        (DatabaseError, UserMessage::new(
            "Data storage error",
            "We had trouble reading or saving your data.",
            &["Try again later", "Contact support if the problem persists"],
        )),
        (SessionError, UserMessage::new(
            "Session expired",
            "Your session is no longer valid.",
            &["Sign in again", "Refresh the page"],
        )),
        (TranscriptError, UserMessage::new(
            "Transcript problem",
            "The transcript could not be read or processed.",
            &["Check the transcript format", "Upload the transcript again"],
        )),
        (SummaryError, UserMessage::new(
            "Summary generation failed",
            "We could not generate a summary for this transcript.",
            &["Try generating the summary again", "Try with a shorter transcript"],
        )),
        (PermissionError, UserMessage::new(
            "Access denied",
            "You do not have permission to perform this action.",
            &["Check that you are signed in with the right account", "Ask an administrator for access"],
        )),
        (QuotaError, UserMessage::new(
            "Usage limit reached",
            "You have reached the usage limit for your plan.",
            &["Wait for your quota to reset", "Upgrade your plan for higher limits"],
        )),
    ])
});

static DEFAULT_USER_MESSAGE: Lazy<UserMessage> = Lazy::new(|| {
    UserMessage::new(
        "An unexpected error occurred",
        "Something went wrong while processing your request.",
        &[
            "Try again in a few moments",
            "Refresh the page",
            "Contact support if the problem persists",
        ],
    )
});

static RECOVERY_TEMPLATES: Lazy<HashMap<ErrorType, RecoveryPlan>> = Lazy::new(|| {
    use ErrorType::*;
    use RecoveryStrategy::*;

    HashMap::from([
        (NetworkError, RecoveryPlan::new(Retry)
            .delay(2000)
            .max_retries(3)
            .backoff(BackoffKind::Exponential)),
        (TimeoutError, RecoveryPlan::new(Retry)
            .delay(5000)
            .max_retries(2)
            .backoff(BackoffKind::Linear)),
        (RateLimitError, RecoveryPlan::new(Retry)
            .delay(60000)
            .max_retries(1)
            .backoff(BackoffKind::Fixed)),
        (ServiceUnavailable, RecoveryPlan::new(Fallback)
            .delay(10000)
            .max_retries(2)
            .fallback_options(&["use_cached_data", "queue_for_later"])),
        (ApiError, RecoveryPlan::new(Fallback)
            .fallback_options(&["use_cached_data", "simplified_processing"])),
        (ProcessingError, RecoveryPlan::new(GracefulDegradation)
            .fallback_options(&["simplified_processing"])
            .degradation_options(&["basic_summary", "skip_optional_steps"])),
        (SummaryError, RecoveryPlan::new(Fallback)
            .fallback_options(&["basic_summary", "manual_entry"])),
        (ValidationError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["fix_input"])),
        (ContentError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["provide_valid_content"])),
        (AuthenticationError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["reauthenticate"])),
        (SessionError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["reauthenticate"])),
        (PermissionError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["request_access"])),
        (QuotaError, RecoveryPlan::new(UserActionRequired)
            .required_actions(&["wait_for_reset", "upgrade_plan"])),
        (DatabaseError, RecoveryPlan::new(SystemIntervention)
            .fallback_options(&["use_cached_data"])
            .intervention_required()),
        (ConfigurationError, RecoveryPlan::new(SystemIntervention)
            .intervention_required()),
    ])
});

/// Severity and retryability of `error_type`
pub fn classify(error_type: ErrorType) -> Classification {
    Classification {
        severity: severity(error_type),
        retryable: retryable(error_type),
    }
}

pub fn severity(error_type: ErrorType) -> Severity {
    if CRITICAL_TYPES.contains(&error_type) {
        Severity::Critical
    } else if HIGH_TYPES.contains(&error_type) {
        Severity::High
    } else if MEDIUM_TYPES.contains(&error_type) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn retryable(error_type: ErrorType) -> bool {
    RETRYABLE_TYPES.contains(&error_type)
}

/// User-facing message for `error_type`, falling back to the default entry
pub fn user_message(error_type: ErrorType) -> UserMessage {
    USER_MESSAGES
        .get(&error_type)
        .unwrap_or(&*DEFAULT_USER_MESSAGE)
        .clone()
}

/// A fresh copy of the recovery template for `error_type`
pub fn recovery_template(error_type: ErrorType) -> RecoveryPlan {
    RECOVERY_TEMPLATES
        .get(&error_type)
        .cloned()
        .unwrap_or_else(default_recovery_plan)
}

pub fn default_user_message() -> UserMessage {
    DEFAULT_USER_MESSAGE.clone()
}

pub fn default_recovery_plan() -> RecoveryPlan {
    RecoveryPlan::new(RecoveryStrategy::UserActionRequired)
        .delay(DEFAULT_RECOVERY_DELAY_MS)
        .required_actions(&["retry_request", "contact_support"])
}
