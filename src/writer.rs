//! Durable line-oriented persistence for flushed metrics.
//!
//! A [`MetricWriter`] serializes [`MetricEntry`] batches through a [`Sink`],
//! one line per entry, and performs a durability flush before returning.
//! Two sinks are provided: [`FileSink`] appends to a file and syncs it to
//! disk, [`BufferSink`] keeps lines in memory for tests and dry runs.
//!
//! Line layout, one entry per line:
//!
//! ```text
//! 2025-06-01 15:00:01.653 "CPU" 0.97
//! ```

use std::fmt::{self, Debug};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::clock::{format_timestamp, Timestamp};
use crate::error::{MetricError, Result};
use crate::registry::validate_name;
use crate::value::MetricValue;

/// One flushed metric: a cycle timestamp, the metric's name and its reduced
/// value.
///
/// Entries are transient; the collector produces them once per flush cycle
/// per non-empty metric and the writer consumes them immediately.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    /// The flush cycle's shared timestamp.
    pub timestamp: Timestamp,
    /// The metric's registered name.
    pub name: String,
    /// The accumulated value to report.
    pub value: MetricValue,
}

impl MetricEntry {
    /// Creates an entry.
    pub fn new(timestamp: Timestamp, name: impl Into<String>, value: MetricValue) -> Self {
        MetricEntry {
            timestamp,
            name: name.into(),
            value,
        }
    }

    /// Renders the sink line for this entry, without a trailing newline.
    pub fn render_line(&self) -> String {
        format!(
            "{} \"{}\" {}",
            format_timestamp(&self.timestamp),
            self.name,
            self.value
        )
    }
}

/// An append-only destination for rendered metric lines.
///
/// `append` adds one line, `sync` makes everything appended so far durable,
/// `close` releases the destination and must be idempotent.
pub trait Sink: Send {
    /// Appends one line (newline handling is the sink's concern).
    fn append(&mut self, line: &str) -> io::Result<()>;

    /// Makes all appended lines durable before returning.
    fn sync(&mut self) -> io::Result<()>;

    /// Closes the destination. Safe to call more than once.
    fn close(&mut self) -> io::Result<()>;
}

fn sink_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "sink closed")
}

/// A buffered append-mode file sink.
///
/// Lines are buffered in memory and made durable by `sync`, which flushes
/// the buffer and calls `sync_data` on the file. The file is opened in
/// append mode so existing data is preserved across runs.
///
/// # Examples
///
/// ```rust,no_run
/// use telemetria::writer::{FileSink, MetricWriter};
///
/// let sink = FileSink::create("metrics.txt")?;
/// let writer = MetricWriter::new(sink);
/// # Ok::<(), telemetria::MetricError>(())
/// ```
pub struct FileSink {
    file: Option<BufWriter<File>>,
    path: PathBuf,
}

impl FileSink {
    /// Opens `path` for appending, creating the file if needed.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileSink {
            file: Some(BufWriter::new(file)),
            path,
        })
    }

    /// Returns the path this sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(sink_closed)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }

    fn sync(&mut self) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(sink_closed)?;
        file.flush()?;
        file.get_ref().sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.get_ref().sync_data()?;
        }
        Ok(())
    }
}

impl Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .finish()
    }
}

/// An in-memory sink collecting rendered lines.
///
/// Clones share the same buffer, so a test can hand one clone to a writer
/// and inspect the other.
///
/// # Examples
///
/// ```rust
/// use telemetria::writer::{BufferSink, MetricWriter, Sink};
///
/// let sink = BufferSink::new();
/// let mut writer_side = sink.clone();
/// writer_side.append("a line").unwrap();
///
/// assert_eq!(sink.lines(), vec!["a line".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    /// Creates an empty buffer sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all lines appended so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Returns the number of lines appended so far.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Returns `true` if no lines have been appended.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Sink for BufferSink {
    fn append(&mut self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Debug for BufferSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSink")
            .field("lines", &self.len())
            .finish()
    }
}

/// Serializes metric entries to a sink with per-batch durability.
///
/// A successful [`write_entries`](Self::write_entries) means every entry of
/// the batch (minus any skipped unserializable ones) is durable in the sink;
/// the collector relies on this before treating the cycle's accumulators as
/// flushed. One entry failing to serialize is skipped and logged without
/// losing the rest of the batch.
///
/// # Examples
///
/// ```rust
/// use telemetria::clock::parse_timestamp;
/// use telemetria::value::{MetricValue, ValueKind};
/// use telemetria::writer::{BufferSink, MetricEntry, MetricWriter};
///
/// let sink = BufferSink::new();
/// let mut writer = MetricWriter::new(sink.clone());
///
/// let mut cpu = MetricValue::new(ValueKind::Float);
/// cpu.observe(0.97.into()).unwrap();
///
/// let timestamp = parse_timestamp("2025-06-01 15:00:01.653").unwrap();
/// writer
///     .write_entries(&[MetricEntry::new(timestamp, "CPU", cpu)])
///     .unwrap();
///
/// assert_eq!(sink.lines(), vec![r#"2025-06-01 15:00:01.653 "CPU" 0.97"#.to_string()]);
/// ```
pub struct MetricWriter {
    sink: Box<dyn Sink>,
    closed: bool,
}

impl MetricWriter {
    /// Creates a writer over the given sink.
    pub fn new(sink: impl Sink + 'static) -> Self {
        MetricWriter {
            sink: Box::new(sink),
            closed: false,
        }
    }

    /// Creates a writer appending to the file at `path`.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(MetricWriter::new(FileSink::create(path)?))
    }

    /// Writes one batch of entries, one line each, then syncs the sink.
    ///
    /// An empty batch is a no-op. An entry whose name cannot be serialized
    /// is skipped and logged, the remaining entries are still written. An
    /// I/O failure aborts the batch with [`MetricError::Sink`]; writing
    /// after [`close`](Self::close) fails with [`MetricError::SinkClosed`].
    pub fn write_entries(&mut self, entries: &[MetricEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if self.closed {
            return Err(MetricError::SinkClosed);
        }

        for entry in entries {
            if let Err(err) = validate_name(&entry.name) {
                warn!(name = %entry.name, %err, "skipping entry with unserializable name");
                continue;
            }
            self.sink.append(&entry.render_line())?;
        }

        self.sink.sync()?;
        Ok(())
    }

    /// Closes the underlying sink. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.close()?;
        Ok(())
    }

    /// Returns `true` once the writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MetricWriter {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "failed to close metric writer");
        }
    }
}

impl Debug for MetricWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricWriter")
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;
    use crate::value::{Sample, ValueKind};

    fn entry(name: &str, value: MetricValue) -> MetricEntry {
        let timestamp = parse_timestamp("2025-06-01 15:00:01.653").unwrap();
        MetricEntry::new(timestamp, name, value)
    }

    fn float_value(samples: &[f64]) -> MetricValue {
        let mut value = MetricValue::new(ValueKind::Float);
        for &sample in samples {
            value.observe(Sample::Float(sample)).unwrap();
        }
        value
    }

    fn unsigned_value(samples: &[u64]) -> MetricValue {
        let mut value = MetricValue::new(ValueKind::Unsigned);
        for &sample in samples {
            value.observe(Sample::Unsigned(sample)).unwrap();
        }
        value
    }

    #[test]
    fn test_render_line() {
        let entry = entry("CPU", float_value(&[0.5, 1.0]));
        assert_eq!(entry.render_line(), r#"2025-06-01 15:00:01.653 "CPU" 0.75"#);
    }

    #[test]
    fn test_render_line_integral() {
        let entry = entry("HTTP requests RPS", unsigned_value(&[10, 20]));
        assert_eq!(
            entry.render_line(),
            r#"2025-06-01 15:00:01.653 "HTTP requests RPS" 30"#
        );
    }

    #[test]
    fn test_write_entries() {
        let sink = BufferSink::new();
        let mut writer = MetricWriter::new(sink.clone());

        writer
            .write_entries(&[
                entry("CPU", float_value(&[0.97])),
                entry("hits", unsigned_value(&[42])),
            ])
            .unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"2025-06-01 15:00:01.653 "CPU" 0.97"#);
        assert_eq!(lines[1], r#"2025-06-01 15:00:01.653 "hits" 42"#);
    }

    #[test]
    fn test_write_empty_batch_is_noop() {
        let sink = BufferSink::new();
        let mut writer = MetricWriter::new(sink.clone());
        writer.write_entries(&[]).unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_bad_entry_skipped_rest_written() {
        let sink = BufferSink::new();
        let mut writer = MetricWriter::new(sink.clone());

        writer
            .write_entries(&[
                entry("good", unsigned_value(&[1])),
                entry("bad\"name", unsigned_value(&[2])),
                entry("also good", unsigned_value(&[3])),
            ])
            .unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"good\""));
        assert!(lines[1].contains("\"also good\""));
    }

    #[test]
    fn test_write_after_close_fails() {
        let sink = BufferSink::new();
        let mut writer = MetricWriter::new(sink.clone());
        writer.close().unwrap();

        let err = writer
            .write_entries(&[entry("CPU", float_value(&[1.0]))])
            .unwrap_err();
        assert!(matches!(err, MetricError::SinkClosed));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_batch_ok_even_after_close() {
        let mut writer = MetricWriter::new(BufferSink::new());
        writer.close().unwrap();
        assert!(writer.write_entries(&[]).is_ok());
    }

    #[test]
    fn test_close_idempotent() {
        let mut writer = MetricWriter::new(BufferSink::new());
        assert!(!writer.is_closed());
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
    }

    #[test]
    fn test_io_failure_surfaces_as_sink_error() {
        struct BrokenSink;

        impl Sink for BrokenSink {
            fn append(&mut self, _line: &str) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn sync(&mut self) -> io::Result<()> {
                Ok(())
            }
            fn close(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = MetricWriter::new(BrokenSink);
        let err = writer
            .write_entries(&[entry("CPU", float_value(&[1.0]))])
            .unwrap_err();
        assert!(matches!(err, MetricError::Sink(_)));
    }

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        let mut writer = MetricWriter::new(FileSink::create(&path).unwrap());
        writer
            .write_entries(&[
                entry("CPU", float_value(&[0.5, 1.0])),
                entry("hits", unsigned_value(&[7])),
            ])
            .unwrap();
        writer.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"2025-06-01 15:00:01.653 "CPU" 0.75"#);
        assert_eq!(lines[1], r#"2025-06-01 15:00:01.653 "hits" 7"#);
    }

    #[test]
    fn test_file_sink_appends_across_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        let mut first = MetricWriter::new(FileSink::create(&path).unwrap());
        first.write_entries(&[entry("a", unsigned_value(&[1]))]).unwrap();
        first.close().unwrap();

        let mut second = MetricWriter::new(FileSink::create(&path).unwrap());
        second.write_entries(&[entry("b", unsigned_value(&[2]))]).unwrap();
        second.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_file_sink_append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        let mut sink = FileSink::create(&path).unwrap();
        sink.append("line").unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        assert!(sink.append("another").is_err());
        assert!(sink.sync().is_err());
    }

    #[test]
    fn test_writer_drop_closes_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.txt");

        {
            let mut writer = MetricWriter::new(FileSink::create(&path).unwrap());
            writer.write_entries(&[entry("CPU", float_value(&[1.0]))]).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
