//! Metrics emitted by the pipeline.
//!
//! Uses the `metrics` facade only; installing a recorder is left to the
//! hosting service.

use metrics::{counter, gauge};

use crate::types::{ErrorRecord, Pattern, PatternKind};

/// Counts one handled error, labelled by type and severity
pub fn record_handled_error(record: &ErrorRecord) {
    counter!(
        "errors.handled",
        1,
        "type" => record.error_type.as_str(),
        "severity" => record.severity.as_str()
    );
    if record.retryable {
        counter!("errors.retryable", 1);
    }
}

pub fn record_pattern(pattern: &Pattern) {
    let kind = match pattern.kind {
        PatternKind::HighFrequency => "high_frequency",
        PatternKind::ComponentSpecific => "component_specific",
    };
    counter!("errors.pattern_detected", 1, "kind" => kind);
}

pub fn record_sink_failure() {
    counter!("errors.sink.failures", 1);
}

pub fn record_log_size(len: usize) {
    gauge!("errors.log.size", len as f64);
}
