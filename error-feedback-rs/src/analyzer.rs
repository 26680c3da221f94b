//! # Error Analyzer
//!
//! Classifies raw failures with an ordered list of rules, first match wins,
//! and assembles the structured `ErrorRecord` stored in the log.

use chrono::Utc;
use serde_json::Value;

use crate::catalog;
use crate::error_log::generate_error_id;
use crate::sanitization::sanitize_context;
use crate::types::{ContextMap, ErrorRecord, ErrorType, RawError};

/// Fallback message when a failure carries none
pub const UNKNOWN_MESSAGE: &str = "Unknown error";

/// A single test applied to a raw failure.
///
/// Name and message tests are case-insensitive substring matches; code tests
/// are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    StatusEquals(u16),
    StatusAtLeast(u16),
    CodeIn(Vec<String>),
    NameContains(Vec<String>),
    MessageContains(Vec<String>),
}

impl Matcher {
    pub fn code_in(codes: &[&str]) -> Self {
        Matcher::CodeIn(codes.iter().map(|c| c.to_string()).collect())
    }

    pub fn name_contains(needles: &[&str]) -> Self {
        Matcher::NameContains(lowercase_all(needles))
    }

    pub fn message_contains(needles: &[&str]) -> Self {
        Matcher::MessageContains(lowercase_all(needles))
    }

    /// Returns true if this matcher applies to `error`
    pub fn matches(&self, error: &RawError) -> bool {
        match self {
            Matcher::StatusEquals(status) => error.status == Some(*status),
            Matcher::StatusAtLeast(floor) => error.status.is_some_and(|s| s >= *floor),
            Matcher::CodeIn(codes) => error
                .code
                .as_deref()
                .is_some_and(|code| codes.iter().any(|c| c == code)),
            Matcher::NameContains(needles) => contains_any(error.name.as_deref(), needles),
            Matcher::MessageContains(needles) => contains_any(error.message.as_deref(), needles),
        }
    }
}

fn lowercase_all(needles: &[&str]) -> Vec<String> {
    needles.iter().map(|n| n.to_lowercase()).collect()
}

fn contains_any(haystack: Option<&str>, needles: &[String]) -> bool {
    match haystack {
        Some(text) => {
            let text = text.to_lowercase();
            needles.iter().any(|n| text.contains(n.as_str()))
        }
        None => false,
    }
}

/// Assigns `error_type` when any of its matchers applies
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub matchers: Vec<Matcher>,
    pub error_type: ErrorType,
}

impl ClassificationRule {
    pub fn new(error_type: ErrorType, matchers: Vec<Matcher>) -> Self {
        Self { matchers, error_type }
    }

    pub fn matches(&self, error: &RawError) -> bool {
        self.matchers.iter().any(|m| m.matches(error))
    }
}

/// Classifier over an ordered rule list
#[derive(Debug, Clone)]
pub struct ErrorAnalyzer {
    rules: Vec<ClassificationRule>,
}

impl Default for ErrorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorAnalyzer {
    /// Creates an analyzer with the built-in rules
    pub fn new() -> Self {
        Self {
            rules: Self::default_rules(),
        }
    }

    /// Creates an analyzer with a custom rule list
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Adds a rule evaluated before every existing rule
    pub fn prepend_rule(&mut self, rule: ClassificationRule) {
        self.rules.insert(0, rule);
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// The built-in rules, in priority order
    pub fn default_rules() -> Vec<ClassificationRule> {
        use ErrorType::*;

        vec![
            // Status codes take priority over everything else
            ClassificationRule::new(AuthenticationError, vec![Matcher::StatusEquals(401)]),
            ClassificationRule::new(PermissionError, vec![Matcher::StatusEquals(403)]),
            ClassificationRule::new(RateLimitError, vec![Matcher::StatusEquals(429)]),
            ClassificationRule::new(ServiceUnavailable, vec![Matcher::StatusAtLeast(500)]),
            ClassificationRule::new(ApiError, vec![Matcher::StatusAtLeast(400)]),
            ClassificationRule::new(
                NetworkError,
                vec![Matcher::code_in(&["ECONNREFUSED", "ENOTFOUND", "ECONNRESET"])],
            ),
            ClassificationRule::new(
                TimeoutError,
                vec![
                    Matcher::code_in(&["ETIMEDOUT", "ESOCKETTIMEDOUT"]),
                    Matcher::message_contains(&["timeout"]),
                ],
            ),
            ClassificationRule::new(
                DatabaseError,
                vec![
                    Matcher::name_contains(&["Sequelize", "Database", "Sql"]),
                    Matcher::message_contains(&["database"]),
                ],
            ),
            ClassificationRule::new(
                ValidationError,
                vec![
                    Matcher::name_contains(&["Validation"]),
                    Matcher::message_contains(&["validation"]),
                ],
            ),
            ClassificationRule::new(
                ProcessingError,
                vec![Matcher::message_contains(&["processing", "format"])],
            ),
            ClassificationRule::new(
                ContentError,
                vec![Matcher::message_contains(&["content", "empty"])],
            ),
        ]
    }

    /// Returns the type of the first matching rule, or `SYSTEM_ERROR`
    pub fn categorize(&self, error: &RawError) -> ErrorType {
        self.rules
            .iter()
            .find(|rule| rule.matches(error))
            .map(|rule| rule.error_type)
            .unwrap_or(ErrorType::SystemError)
    }

    /// Builds a record for `error`; the stored context is sanitized
    pub fn analyze(&self, error: &RawError, context: &ContextMap) -> ErrorRecord {
        let error_type = self.categorize(error);
        let classification = catalog::classify(error_type);

        ErrorRecord {
            id: generate_error_id(),
            timestamp: Utc::now(),
            error_type,
            severity: classification.severity,
            retryable: classification.retryable,
            component: context_string(context, "component").unwrap_or_else(|| "unknown".to_string()),
            operation: context_string(context, "operation").unwrap_or_else(|| "unknown".to_string()),
            user_id: context_string(context, "userId").unwrap_or_else(|| "anonymous".to_string()),
            session_id: context_string(context, "sessionId"),
            transcript_id: context_string(context, "transcriptId"),
            message: error
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_MESSAGE.to_string()),
            context: sanitize_context(context),
        }
    }
}

// Identifiers may arrive as strings or numbers
fn context_string(context: &ContextMap, key: &str) -> Option<String> {
    match context.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
