//! # User Feedback
//!
//! Turns a handled error into the payload shown to end users: a
//! severity-tagged message, an ordered list of actions and support details.
//! Technical details are only included outside production.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_RECOVERY_DELAY_MS;
use crate::handler::{ErrorHandler, HandledError};
use crate::types::{ContextMap, ErrorType, Pattern, RawError, Severity};

pub const GENERAL_DOCUMENTATION_URL: &str = "/docs/troubleshooting";

static FALLBACK_LABELS: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    HashMap::from([
        ("use_cached_data", ("Use saved data", "Continue with the most recently saved results")),
        ("simplified_processing", ("Try simplified processing", "Process your request with fewer features")),
        ("queue_for_later", ("Queue for later", "We will process your request when the service recovers")),
        ("basic_summary", ("Generate basic summary", "Create a shorter summary with less detail")),
        ("manual_entry", ("Enter manually", "Provide the information yourself")),
    ])
});

const GENERIC_FALLBACK: (&str, &str) = ("Try alternative", "Use an alternative way to complete this action");

static DOCUMENTATION_URLS: Lazy<HashMap<ErrorType, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ErrorType::AuthenticationError, "/docs/authentication"),
        (ErrorType::PermissionError, "/docs/permissions"),
        (ErrorType::RateLimitError, "/docs/rate-limits"),
        (ErrorType::QuotaError, "/docs/rate-limits"),
        (ErrorType::ValidationError, "/docs/input-requirements"),
        (ErrorType::ContentError, "/docs/input-requirements"),
        (ErrorType::TranscriptError, "/docs/transcripts"),
        (ErrorType::SummaryError, "/docs/summaries"),
        (ErrorType::NetworkError, "/docs/connectivity"),
        (ErrorType::TimeoutError, "/docs/connectivity"),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Retry,
    Fallback,
    Suggestion,
}

/// Something the user can do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub label: String,
    pub description: String,
    /// Wait before retrying, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Fallback option this action stands for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

/// Only present outside production
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalDetails {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: String,
    pub component: String,
    pub operation: String,
    pub context: ContextMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMessage {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<TechnicalDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportInfo {
    pub error_id: String,
    pub report_url: String,
    pub contact_email: String,
    pub status_page_url: String,
    pub documentation_url: String,
}

/// Payload returned to end users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub error_id: String,
    pub severity: Severity,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
    pub user_message: FeedbackMessage,
    pub actions: Vec<FeedbackAction>,
    pub support: SupportInfo,
    pub pattern: Option<Pattern>,
}

/// Formats handled errors for end users
#[derive(Debug, Clone)]
pub struct UserFeedbackSystem {
    handler: Arc<ErrorHandler>,
}

impl UserFeedbackSystem {
    pub fn new(handler: Arc<ErrorHandler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<ErrorHandler> {
        &self.handler
    }

    /// Handles `error` and renders the user-facing response. Never fails.
    pub fn generate_error_response(&self, error: &RawError, context: &ContextMap) -> FeedbackResponse {
        let handled = self.handler.handle_error(error, context);
        self.render(handled)
    }

    /// Renders an already handled error
    pub fn render(&self, handled: HandledError) -> FeedbackResponse {
        let config = self.handler.config();

        let technical = (!config.is_production()).then(|| TechnicalDetails {
            error_type: handled.error_type,
            message: handled.message.clone(),
            component: handled.component.clone(),
            operation: handled.operation.clone(),
            context: handled.sanitized_context.clone(),
        });

        let support = SupportInfo {
            error_id: handled.error_id.clone(),
            report_url: report_url(&handled.error_id),
            contact_email: config.support_email.clone(),
            status_page_url: config.status_page_url.clone(),
            documentation_url: documentation_url(handled.error_type).to_string(),
        };

        FeedbackResponse {
            user_message: FeedbackMessage {
                title: format!("[{}] {}", handled.severity, handled.title),
                description: handled.details.clone(),
                technical,
            },
            actions: build_actions(&handled),
            support,
            error_id: handled.error_id,
            severity: handled.severity,
            retryable: handled.retryable,
            timestamp: handled.timestamp,
            pattern: handled.pattern,
        }
    }
}

/// Retry first, then fallbacks, then numbered suggestions
fn build_actions(handled: &HandledError) -> Vec<FeedbackAction> {
    let mut actions = Vec::new();

    if handled.retryable {
        actions.push(FeedbackAction {
            kind: ActionKind::Retry,
            label: "Try again".to_string(),
            description: "Retry the request after a short wait".to_string(),
            delay: Some(handled.recovery_plan.delay.unwrap_or(DEFAULT_RECOVERY_DELAY_MS)),
            option: None,
        });
    }

    for option in &handled.recovery_plan.fallback_options {
        let (label, description) = FALLBACK_LABELS
            .get(option.as_str())
            .copied()
            .unwrap_or(GENERIC_FALLBACK);
        actions.push(FeedbackAction {
            kind: ActionKind::Fallback,
            label: label.to_string(),
            description: description.to_string(),
            delay: None,
            option: Some(option.clone()),
        });
    }

    for (i, suggestion) in handled.suggestions.iter().enumerate() {
        actions.push(FeedbackAction {
            kind: ActionKind::Suggestion,
            label: format!("Step {}", i + 1),
            description: suggestion.clone(),
            delay: None,
            option: None,
        });
    }

    actions
}

pub fn report_url(error_id: &str) -> String {
    format!("/support/report?errorId={}", error_id)
}

pub fn documentation_url(error_type: ErrorType) -> &'static str {
    DOCUMENTATION_URLS
        .get(&error_type)
        .copied()
        .unwrap_or(GENERAL_DOCUMENTATION_URL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HandlerConfig, DEFAULT_STATUS_PAGE_URL, DEFAULT_SUPPORT_EMAIL};
    use serde_json::json;

    fn feedback(config: HandlerConfig) -> UserFeedbackSystem {
        UserFeedbackSystem::new(Arc::new(ErrorHandler::new(config).unwrap()))
    }

    #[test]
    fn test_retryable_error_has_retry_first() {
        let system = feedback(HandlerConfig::default());
        let response = system.generate_error_response(&RawError::new().with_status(503), &ContextMap::new());

        assert!(response.retryable);
        let first = &response.actions[0];
        assert_eq!(first.kind, ActionKind::Retry);
        assert_eq!(first.delay, Some(10000));
        assert_eq!(response.actions.iter().filter(|a| a.kind == ActionKind::Retry).count(), 1);

        let fallbacks: Vec<_> = response
            .actions
            .iter()
            .filter(|a| a.kind == ActionKind::Fallback)
            .map(|a| a.label.as_str())
            .collect();
        assert_eq!(fallbacks, vec!["Use saved data", "Queue for later"]);
    }

    #[test]
    fn test_non_retryable_error_has_no_retry() {
        let system = feedback(HandlerConfig::default());
        let response = system.generate_error_response(&RawError::new().with_status(403), &ContextMap::new());

        assert!(!response.retryable);
        assert!(response.actions.iter().all(|a| a.kind != ActionKind::Retry));
    }

    #[test]
    fn test_retry_delay_defaults_when_plan_has_none() {
        let system = feedback(HandlerConfig::default());
        let mut handled = system
            .handler()
            .handle_error(&RawError::new().with_code("ECONNREFUSED"), &ContextMap::new());
        handled.recovery_plan.delay = None;

        let response = system.render(handled);
        assert_eq!(response.actions[0].delay, Some(DEFAULT_RECOVERY_DELAY_MS));
    }

    #[test]
    fn test_action_order_and_step_labels() {
        let system = feedback(HandlerConfig::default());
        let response = system.generate_error_response(&RawError::message("processing failed"), &ContextMap::new());

        let kinds: Vec<_> = response.actions.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActionKind::Fallback,
                ActionKind::Suggestion,
                ActionKind::Suggestion,
                ActionKind::Suggestion,
            ]
        );
        assert_eq!(response.actions[1].label, "Step 1");
        assert_eq!(response.actions[3].label, "Step 3");
    }

    #[test]
    fn test_unknown_fallback_option_uses_generic_label() {
        let system = feedback(HandlerConfig::default());
        let mut handled = system.handler().handle_error(&RawError::new().with_status(404), &ContextMap::new());
        handled.recovery_plan.fallback_options = vec!["teleport".to_string()];

        let response = system.render(handled);
        let fallback = response.actions.iter().find(|a| a.kind == ActionKind::Fallback).unwrap();
        assert_eq!(fallback.label, GENERIC_FALLBACK.0);
        assert_eq!(fallback.option.as_deref(), Some("teleport"));
    }

    #[test]
    fn test_message_and_support() {
        let system = feedback(HandlerConfig::default());
        let response = system.generate_error_response(&RawError::new().with_status(429), &ContextMap::new());

        assert_eq!(response.user_message.title, "[MEDIUM] Too many requests");
        assert_eq!(response.support.report_url, format!("/support/report?errorId={}", response.error_id));
        assert_eq!(response.support.contact_email, DEFAULT_SUPPORT_EMAIL);
        assert_eq!(response.support.status_page_url, DEFAULT_STATUS_PAGE_URL);
        assert_eq!(response.support.documentation_url, "/docs/rate-limits");

        let other = system.generate_error_response(&RawError::message("disk exploded"), &ContextMap::new());
        assert_eq!(other.support.documentation_url, GENERAL_DOCUMENTATION_URL);
    }

    #[test]
    fn test_technical_details_follow_environment() {
        let ctx = json!({ "component": "uploader", "token": "secret" })
            .as_object()
            .cloned()
            .unwrap();

        let dev = feedback(HandlerConfig::default().environment("development"));
        let response = dev.generate_error_response(&RawError::message("empty file"), &ctx);
        let technical = response.user_message.technical.unwrap();
        assert_eq!(technical.component, "uploader");
        assert!(!technical.context.contains_key("token"));

        let prod = feedback(HandlerConfig::default().environment("production"));
        let response = prod.generate_error_response(&RawError::message("empty file"), &ctx);
        assert!(response.user_message.technical.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["userMessage"].get("technical").is_none());
    }

    #[test]
    fn test_unset_environment_hides_technical_details() {
        let ctx = json!({ "component": "billing", "internalNote": "db host 10.0.0.5" })
            .as_object()
            .cloned()
            .unwrap();

        let system = feedback(HandlerConfig::default());
        let response = system.generate_error_response(
            &RawError::message("database password rejected for admin"),
            &ctx,
        );

        assert!(response.user_message.technical.is_none());
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("10.0.0.5"));
        assert!(!json.contains("password rejected"));
    }
}
