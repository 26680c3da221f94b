//! # Pattern Detection
//!
//! Scans the error log for frequency anomalies right after a record has been
//! appended. At most one pattern is reported per call; a high-frequency burst
//! takes priority over a component-specific recurrence.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::types::{ErrorRecord, Pattern, PatternKind};

pub const INVESTIGATE_ROOT_CAUSE: &str = "investigate_root_cause";
pub const CHECK_COMPONENT_HEALTH: &str = "check_component_health";

/// Thresholds used by the detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternConfig {
    /// Trailing window for the high-frequency check
    pub frequency_window: Duration,
    /// Same-type records within the window needed to raise a pattern
    pub frequency_threshold: usize,
    /// How many recent records of the component are inspected
    pub component_sample: usize,
    /// Same-type records within the sample needed to raise a pattern
    pub component_threshold: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            frequency_window: Duration::minutes(5),
            frequency_threshold: 5,
            component_sample: 10,
            component_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Checks `log`, which already contains `record`, as of `now`
    pub fn detect(
        &self,
        record: &ErrorRecord,
        log: &VecDeque<ErrorRecord>,
        now: DateTime<Utc>,
    ) -> Option<Pattern> {
        self.high_frequency(record, log, now)
            .or_else(|| self.component_specific(record, log))
    }

    fn high_frequency(
        &self,
        record: &ErrorRecord,
        log: &VecDeque<ErrorRecord>,
        now: DateTime<Utc>,
    ) -> Option<Pattern> {
        let since = now - self.config.frequency_window;
        let count = log
            .iter()
            .filter(|r| r.error_type == record.error_type && r.timestamp >= since)
            .count();

        (count >= self.config.frequency_threshold).then(|| Pattern {
            kind: PatternKind::HighFrequency,
            description: format!("{} occurring frequently", record.error_type),
            count,
            window: Some(describe_window(self.config.frequency_window)),
            recommendation: INVESTIGATE_ROOT_CAUSE.to_string(),
        })
    }

    fn component_specific(&self, record: &ErrorRecord, log: &VecDeque<ErrorRecord>) -> Option<Pattern> {
        let count = log
            .iter()
            .rev()
            .filter(|r| r.component == record.component)
            .take(self.config.component_sample)
            .filter(|r| r.error_type == record.error_type)
            .count();

        (count >= self.config.component_threshold).then(|| Pattern {
            kind: PatternKind::ComponentSpecific,
            description: format!("Recurring {} in {}", record.error_type, record.component),
            count,
            window: None,
            recommendation: CHECK_COMPONENT_HEALTH.to_string(),
        })
    }
}

fn describe_window(window: Duration) -> String {
    let minutes = window.num_minutes();
    if minutes == 1 {
        "1 minute".to_string()
    } else if minutes > 0 {
        format!("{} minutes", minutes)
    } else {
        format!("{} seconds", window.num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextMap, ErrorType, Severity};

    fn record(error_type: ErrorType, component: &str, timestamp: DateTime<Utc>) -> ErrorRecord {
        ErrorRecord {
            id: crate::error_log::generate_error_id(),
            timestamp,
            error_type,
            severity: Severity::Medium,
            retryable: false,
            component: component.to_string(),
            operation: "op".to_string(),
            user_id: "anonymous".to_string(),
            session_id: None,
            transcript_id: None,
            message: "boom".to_string(),
            context: ContextMap::new(),
        }
    }

    #[test]
    fn test_high_frequency_threshold() {
        let detector = PatternDetector::default();
        let now = Utc::now();
        let mut log = VecDeque::new();

        for i in 0..4 {
            log.push_back(record(ErrorType::TimeoutError, &format!("c{i}"), now));
        }
        let last = log.back().cloned().unwrap();
        assert!(detector.detect(&last, &log, now).is_none());

        let fifth = record(ErrorType::TimeoutError, "c5", now);
        log.push_back(fifth.clone());
        let pattern = detector.detect(&fifth, &log, now).unwrap();

        assert_eq!(pattern.kind, PatternKind::HighFrequency);
        assert_eq!(pattern.count, 5);
        assert_eq!(pattern.description, "TIMEOUT_ERROR occurring frequently");
        assert_eq!(pattern.window.as_deref(), Some("5 minutes"));
        assert_eq!(pattern.recommendation, INVESTIGATE_ROOT_CAUSE);
    }

    #[test]
    fn test_old_records_fall_outside_window() {
        let detector = PatternDetector::default();
        let now = Utc::now();
        let old = now - Duration::minutes(10);
        let mut log = VecDeque::new();

        for i in 0..4 {
            log.push_back(record(ErrorType::ApiError, &format!("c{i}"), old));
        }
        let current = record(ErrorType::ApiError, "fresh", now);
        log.push_back(current.clone());

        assert!(detector.detect(&current, &log, now).is_none());
    }

    #[test]
    fn test_component_specific() {
        let detector = PatternDetector::default();
        let now = Utc::now();
        let old = now - Duration::hours(1);
        let mut log = VecDeque::new();

        log.push_back(record(ErrorType::ContentError, "uploader", old));
        log.push_back(record(ErrorType::ApiError, "uploader", old));
        log.push_back(record(ErrorType::ContentError, "uploader", old));
        let current = record(ErrorType::ContentError, "uploader", now);
        log.push_back(current.clone());

        let pattern = detector.detect(&current, &log, now).unwrap();
        assert_eq!(pattern.kind, PatternKind::ComponentSpecific);
        assert_eq!(pattern.count, 3);
        assert_eq!(pattern.description, "Recurring CONTENT_ERROR in uploader");
        assert!(pattern.window.is_none());
        assert_eq!(pattern.recommendation, CHECK_COMPONENT_HEALTH);
    }

    #[test]
    fn test_component_sample_is_bounded() {
        let detector = PatternDetector::default();
        let now = Utc::now();
        let old = now - Duration::hours(1);
        let mut log = VecDeque::new();

        // Two matches pushed out of the 10-record sample by newer records
        log.push_back(record(ErrorType::StorageError, "store", old));
        log.push_back(record(ErrorType::StorageError, "store", old));
        for _ in 0..9 {
            log.push_back(record(ErrorType::ApiError, "store", old));
        }
        let current = record(ErrorType::StorageError, "store", now);
        log.push_back(current.clone());

        assert!(detector.detect(&current, &log, now).is_none());
    }

    #[test]
    fn test_high_frequency_takes_priority() {
        let detector = PatternDetector::default();
        let now = Utc::now();
        let log: VecDeque<_> = (0..6)
            .map(|_| record(ErrorType::NetworkError, "fetcher", now))
            .collect();
        let last = log.back().cloned().unwrap();

        let pattern = detector.detect(&last, &log, now).unwrap();
        assert_eq!(pattern.kind, PatternKind::HighFrequency);
        assert_eq!(pattern.count, 6);
    }
}
