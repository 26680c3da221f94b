//! # Log Export
//!
//! Writes a snapshot of the in-memory log to a standalone timestamped file.
//! Unlike the rest of the pipeline, export failures are returned to the
//! caller.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::types::{Error, ErrorKind, ErrorRecord, Result};

const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "id",
    "type",
    "severity",
    "message",
    "component",
    "operation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(Error::new(
                ErrorKind::Export,
                format!("Unsupported export format: {}", other),
            )),
        }
    }
}

/// Writes `records` to `<dir>/error-export-<timestamp>.<ext>` and returns the path
pub fn export_records(
    records: &[ErrorRecord],
    format: ExportFormat,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let body = match format {
        ExportFormat::Json => serde_json::to_string_pretty(records)
            .map_err(|e| Error::from(e).with_kind(ErrorKind::Export))?,
        ExportFormat::Csv => to_csv(records),
    };

    let stem = format!("error-export-{}", now.format("%Y-%m-%dT%H-%M-%S%.3fZ"));

    fs::create_dir_all(dir)
        .and_then(|_| write_new_file(dir, &stem, format.extension(), body.as_bytes()))
        .map_err(|e| {
            Error::new(
                ErrorKind::Export,
                format!("Failed to write export {} in {}: {}", stem, dir.display(), e),
            )
            .cause(e)
        })
}

// Never overwrites: a name taken by an earlier export gets a `-<n>` suffix
fn write_new_file(dir: &Path, stem: &str, extension: &str, body: &[u8]) -> io::Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{}.{}", stem, extension),
            n => format!("{}-{}.{}", stem, n, extension),
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body)?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Renders the fixed seven-column projection, every field quoted
pub fn to_csv(records: &[ErrorRecord]) -> String {
    let mut out = csv_row(CSV_HEADER.iter().copied());
    for record in records {
        let timestamp = record.timestamp.to_rfc3339();
        out.push_str(&csv_row([
            timestamp.as_str(),
            record.id.as_str(),
            record.error_type.as_str(),
            record.severity.as_str(),
            record.message.as_str(),
            record.component.as_str(),
            record.operation.as_str(),
        ]));
    }
    out
}

fn csv_row<'a, I: IntoIterator<Item = &'a str>>(fields: I) -> String {
    let mut row = fields
        .into_iter()
        .map(csv_field)
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextMap, ErrorType, Severity};

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord {
            id: "err_1_0_00000000".to_string(),
            timestamp: Utc::now(),
            error_type: ErrorType::ValidationError,
            severity: Severity::Low,
            retryable: false,
            component: "form".to_string(),
            operation: "submit".to_string(),
            user_id: "u1".to_string(),
            session_id: None,
            transcript_id: None,
            message: message.to_string(),
            context: ContextMap::new(),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);

        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Export);
    }

    #[test]
    fn test_csv_quotes_and_doubles() {
        let csv = to_csv(&[record(r#"field "email", is bad"#)]);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            r#""timestamp","id","type","severity","message","component","operation""#
        );
        let row = lines.next().unwrap();
        assert!(row.contains(r#""field ""email"", is bad""#));
        assert!(row.contains(r#""VALIDATION_ERROR","LOW""#));
        assert!(row.ends_with(r#""form","submit""#));
    }

    #[test]
    fn test_export_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("one"), record("two")];

        let path = export_records(&records, ExportFormat::Json, dir.path(), Utc::now()).unwrap();
        assert!(path.extension().is_some_and(|e| e == "json"));

        let parsed: Vec<ErrorRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_exports_in_same_instant_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        let first = export_records(&[record("first")], ExportFormat::Json, dir.path(), now).unwrap();
        let second = export_records(&[record("second")], ExportFormat::Json, dir.path(), now).unwrap();

        assert_ne!(first, second);
        assert!(second.to_string_lossy().ends_with("-1.json"));

        let first_records: Vec<ErrorRecord> =
            serde_json::from_str(&fs::read_to_string(&first).unwrap()).unwrap();
        let second_records: Vec<ErrorRecord> =
            serde_json::from_str(&fs::read_to_string(&second).unwrap()).unwrap();
        assert_eq!(first_records[0].message, "first");
        assert_eq!(second_records[0].message, "second");
    }

    #[test]
    fn test_export_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let err = export_records(&[record("x")], ExportFormat::Csv, &blocker, Utc::now()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Export);
    }
}
