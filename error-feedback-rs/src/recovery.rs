//! Recovery plan selection.

use serde_json::Value;

use crate::catalog;
use crate::types::{ContextMap, ErrorRecord, ErrorType, RecoveryPlan};

/// Maps classified records to recovery plans
#[derive(Debug, Clone, Default)]
pub struct RecoveryPlanner;

impl RecoveryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Returns a fresh plan for `record`.
    ///
    /// `context` is the caller's original, unsanitized context; validation
    /// failures take their `validationRules` from it.
    pub fn plan(&self, record: &ErrorRecord, context: &ContextMap) -> RecoveryPlan {
        let mut plan = catalog::recovery_template(record.error_type);

        if record.error_type == ErrorType::ValidationError {
            plan.validation_rules = validation_rules(context);
        }

        plan
    }
}

fn validation_rules(context: &ContextMap) -> Vec<String> {
    match context.get("validationRules") {
        Some(Value::Array(rules)) => rules
            .iter()
            .map(|rule| match rule {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(rule)) => vec![rule.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ErrorAnalyzer;
    use crate::types::{RawError, RecoveryStrategy};
    use serde_json::json;

    fn context(value: Value) -> ContextMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_validation_rules_override() {
        let ctx = context(json!({
            "validationRules": ["email must be valid", "name is required"],
        }));
        let record = ErrorAnalyzer::new().analyze(&RawError::new().with_name("ValidationError"), &ctx);

        let plan = RecoveryPlanner::new().plan(&record, &ctx);

        assert_eq!(plan.strategy, RecoveryStrategy::UserActionRequired);
        assert_eq!(plan.validation_rules, vec!["email must be valid", "name is required"]);
    }

    #[test]
    fn test_validation_rules_default_to_empty() {
        let ctx = ContextMap::new();
        let record = ErrorAnalyzer::new().analyze(&RawError::message("validation failed"), &ctx);

        let plan = RecoveryPlanner::new().plan(&record, &ctx);
        assert!(plan.validation_rules.is_empty());
    }

    #[test]
    fn test_rules_ignored_for_other_types() {
        let ctx = context(json!({ "validationRules": ["ignored"] }));
        let record = ErrorAnalyzer::new().analyze(&RawError::new().with_code("ECONNREFUSED"), &ctx);

        let plan = RecoveryPlanner::new().plan(&record, &ctx);

        assert_eq!(plan.strategy, RecoveryStrategy::Retry);
        assert_eq!(plan.max_retries, Some(3));
        assert!(plan.validation_rules.is_empty());
    }

    #[test]
    fn test_plans_are_not_shared() {
        let ctx = ContextMap::new();
        let record = ErrorAnalyzer::new().analyze(&RawError::new().with_status(500), &ctx);
        let planner = RecoveryPlanner::new();

        let mut first = planner.plan(&record, &ctx);
        first.fallback_options.clear();

        let second = planner.plan(&record, &ctx);
        assert_eq!(second.fallback_options, vec!["use_cached_data", "queue_for_later"]);
    }
}
