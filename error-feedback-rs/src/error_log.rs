//! # Error Log
//!
//! Bounded in-memory history of classified errors plus the durable,
//! newline-delimited JSON sink that mirrors every append to a dated file.
//!
//! The sink never blocks the caller beyond queueing the line: writes are
//! handed to a dedicated writer thread, and failures are reported on the
//! operator channel and counted rather than returned.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::monitoring;
use crate::types::{Error, ErrorKind, ErrorRecord, Result};

/// Default number of records kept in memory
pub const DEFAULT_CAPACITY: usize = 1000;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates a process-unique record id of the form
/// `err_<unix-millis>_<sequence>_<random>`.
pub fn generate_error_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let salt: u32 = rand::thread_rng().gen();
    format!("err_{}_{}_{:08x}", millis, seq, salt)
}

/// Ordered, capacity-bounded record buffer with FIFO eviction
#[derive(Debug, Clone)]
pub struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ErrorLog {
    /// Creates an empty log; a zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Appends `record` and evicts from the head until within capacity.
    /// Returns the number of evicted records.
    pub fn append(&mut self, record: ErrorRecord) -> usize {
        self.records.push_back(record);

        let mut evicted = 0;
        while self.records.len() > self.capacity {
            self.records.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &VecDeque<ErrorRecord> {
        &self.records
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Destination for durable copies of appended records
pub trait LogSink: Send + Sync {
    /// Queues `record` for writing. Must not fail or block on I/O.
    fn write(&self, record: &ErrorRecord);

    /// Blocks until every queued record has been handled
    fn flush(&self) {}
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write(&self, _record: &ErrorRecord) {}
}

enum SinkCommand {
    Write { date: NaiveDate, line: String },
    Flush(std_mpsc::SyncSender<()>),
}

/// Appends one JSON line per record to `<dir>/errors-<YYYY-MM-DD>.log`
pub struct FileSink {
    dir: PathBuf,
    sender: Option<mpsc::UnboundedSender<SinkCommand>>,
    worker: Option<JoinHandle<()>>,
    failures: Arc<AtomicU64>,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("dir", &self.dir)
            .field("failures", &self.failures())
            .finish()
    }
}

impl FileSink {
    /// Creates the log directory if needed and starts the writer thread
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::new(
                ErrorKind::Configuration,
                format!("Failed to create log directory {}: {}", dir.display(), e),
            )
            .cause(e)
        })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));

        let worker_dir = dir.clone();
        let worker_failures = Arc::clone(&failures);
        let worker = std::thread::Builder::new()
            .name("error-log-sink".to_string())
            .spawn(move || run_writer(worker_dir, receiver, worker_failures))?;

        debug!(dir = %dir.display(), "Error log sink started");

        Ok(Self {
            dir,
            sender: Some(sender),
            worker: Some(worker),
            failures,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the daily file for `date`
    pub fn path_for(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("errors-{}.log", date.format("%Y-%m-%d")))
    }

    /// Number of records that could not be written
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record_failure(&self, reason: &str) {
        report_failure(&self.failures, &self.dir, reason);
    }
}

impl LogSink for FileSink {
    fn write(&self, record: &ErrorRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                self.record_failure(&format!("failed to serialize record {}: {}", record.id, e));
                return;
            }
        };

        let command = SinkCommand::Write {
            date: record.timestamp.date_naive(),
            line,
        };

        let sent = self
            .sender
            .as_ref()
            .map(|tx| tx.send(command).is_ok())
            .unwrap_or(false);
        if !sent {
            self.record_failure("writer thread is not running");
        }
    }

    // Blocks the calling thread until the writer acknowledges
    fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (ack, done) = std_mpsc::sync_channel(1);
        if sender.send(SinkCommand::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_writer(dir: PathBuf, mut receiver: mpsc::UnboundedReceiver<SinkCommand>, failures: Arc<AtomicU64>) {
    while let Some(command) = receiver.blocking_recv() {
        match command {
            SinkCommand::Write { date, line } => {
                let path = FileSink::path_for(&dir, date);
                if let Err(e) = append_line(&path, &line) {
                    report_failure(&failures, &path, &e.to_string());
                }
            }
            SinkCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

fn report_failure(failures: &AtomicU64, path: &Path, reason: &str) {
    failures.fetch_add(1, Ordering::Relaxed);
    monitoring::record_sink_failure();
    error!(path = %path.display(), reason = %reason, "Failed to write error log entry");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextMap, ErrorType, Severity};
    use std::collections::HashSet;

    fn record(message: &str) -> ErrorRecord {
        ErrorRecord {
            id: generate_error_id(),
            timestamp: Utc::now(),
            error_type: ErrorType::SystemError,
            severity: Severity::High,
            retryable: false,
            component: "test".to_string(),
            operation: "op".to_string(),
            user_id: "anonymous".to_string(),
            session_id: None,
            transcript_id: None,
            message: message.to_string(),
            context: ContextMap::new(),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| generate_error_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("err_")));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = ErrorLog::new(1000);
        let mut evicted = 0;
        for i in 0..1001 {
            evicted += log.append(record(&format!("error {i}")));
        }

        assert_eq!(log.len(), 1000);
        assert_eq!(evicted, 1);
        assert_eq!(log.records().front().unwrap().message, "error 1");
        assert_eq!(log.records().back().unwrap().message, "error 1000");
    }

    #[test]
    fn test_clear() {
        let mut log = ErrorLog::new(3);
        log.append(record("a"));
        log.append(record("b"));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 3);
    }

    #[test]
    fn test_file_sink_writes_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();

        let first = record("first");
        let second = record("second");
        sink.write(&first);
        sink.write(&second);
        sink.flush();

        let path = FileSink::path_for(dir.path(), first.timestamp.date_naive());
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<ErrorRecord> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines, vec![first, second]);
        assert_eq!(sink.failures(), 0);
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("errors-"));
    }

    #[tokio::test]
    async fn test_flush_inside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();

        let entry = record("from a task");
        sink.write(&entry);
        sink.flush();

        let path = FileSink::path_for(dir.path(), entry.timestamp.date_naive());
        assert_eq!(fs::read_to_string(path).unwrap().lines().count(), 1);
    }

    #[test_log::test]
    fn test_file_sink_failure_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path()).unwrap();

        // A directory where the daily file should be makes the open fail
        let entry = record("blocked");
        fs::create_dir(FileSink::path_for(dir.path(), entry.timestamp.date_naive())).unwrap();

        sink.write(&entry);
        sink.flush();

        assert_eq!(sink.failures(), 1);
    }
}
