//! # Error Statistics
//!
//! Time-windowed counts and top-N ranking over a log snapshot.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{ErrorRecord, ErrorType, Severity};

/// Number of entries in `ErrorStats::top_errors`
pub const TOP_ERRORS_LIMIT: usize = 5;

static WINDOW_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)([mhd])$").expect("valid window pattern"));

/// Parses `<integer><unit>` with unit `m`, `h` or `d`.
///
/// Anything else, including values that overflow, yields 24 hours.
pub fn parse_time_window(window: &str) -> Duration {
    try_parse_time_window(window.trim()).unwrap_or_else(|| Duration::hours(24))
}

fn try_parse_time_window(window: &str) -> Option<Duration> {
    let caps = WINDOW_PATTERN.captures(window)?;
    let value: i64 = caps[1].parse().ok()?;
    let unit_ms: i64 = match &caps[2] {
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return None,
    };
    Some(Duration::milliseconds(value.checked_mul(unit_ms)?))
}

/// Occurrence count of one error type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub count: usize,
}

/// Aggregated view of the log over a trailing window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    /// The window as requested
    pub window: String,
    pub total: usize,
    pub by_type: BTreeMap<ErrorType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_component: BTreeMap<String, usize>,
    pub top_errors: Vec<TopError>,
}

/// Aggregates the records of `log` with a timestamp in `[now - window, now]`.
///
/// Equal counts in `top_errors` keep the order in which the types were first
/// seen while scanning the log from oldest to newest.
pub fn compute_stats(log: &VecDeque<ErrorRecord>, window: &str, now: DateTime<Utc>) -> ErrorStats {
    let since = now - parse_time_window(window);

    let mut stats = ErrorStats {
        window: window.to_string(),
        total: 0,
        by_type: BTreeMap::new(),
        by_severity: BTreeMap::new(),
        by_component: BTreeMap::new(),
        top_errors: Vec::new(),
    };

    let mut discovered: Vec<ErrorType> = Vec::new();
    let mut type_counts: HashMap<ErrorType, usize> = HashMap::new();

    for record in log.iter().filter(|r| r.timestamp >= since && r.timestamp <= now) {
        stats.total += 1;
        *stats.by_type.entry(record.error_type).or_insert(0) += 1;
        *stats.by_severity.entry(record.severity).or_insert(0) += 1;
        *stats.by_component.entry(record.component.clone()).or_insert(0) += 1;

        let count = type_counts.entry(record.error_type).or_insert(0);
        if *count == 0 {
            discovered.push(record.error_type);
        }
        *count += 1;
    }

    let mut ranked: Vec<TopError> = discovered
        .into_iter()
        .map(|error_type| TopError {
            error_type,
            count: type_counts[&error_type],
        })
        .collect();
    // Stable sort keeps discovery order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_ERRORS_LIMIT);
    stats.top_errors = ranked;

    stats
}
