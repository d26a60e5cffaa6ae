//! The collector: metric lifecycle, hot recording path and the periodic
//! flush pipeline.
//!
//! A [`Collector`] owns a [`MetricRegistry`] and a [`MetricWriter`] and moves
//! accumulated samples from producers to the sink:
//!
//! ```text
//!   producer threads                      background thread
//!
//!   record("CPU", 0.97) ──┐
//!   record("CPU", 0.51) ──┼──► Metric ──► snapshot_and_reset ──┐
//!   record("rps", 42)   ──┴──► Metric ──► snapshot_and_reset ──┼──► MetricWriter
//!                                          (every interval)    │    (one batch,
//!                                                              │     one timestamp,
//!                                                              ┘     durable)
//! ```
//!
//! Recording is O(1) under the target metric's own lock and never performs
//! I/O. The background thread wakes once per interval, drains every metric
//! in a single pass and hands the batch to the writer with no metric or
//! registry lock held, so a slow sink delays the cadence but never stalls
//! producers.
//!
//! # Lifecycle
//!
//! A collector is constructed idle, accepts records only between
//! [`start`](Collector::start) and [`stop`](Collector::stop) (both
//! idempotent), and performs one final synchronous flush during `stop` so no
//! accumulated samples are lost at shutdown. Dropping a running collector
//! stops it. [`ScopedCollector`] packages this pattern as a guard.

use std::fmt::{self, Debug};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use atomic_time::AtomicOptionInstant;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::clock;
use crate::error::Result;
use crate::metric::Metric;
use crate::registry::MetricRegistry;
use crate::value::{MetricValue, Sample, ValueKind};
use crate::writer::{MetricEntry, MetricWriter};

/// What to do with a cycle's snapshot when the sink fails to persist it.
///
/// Under [`Retain`](SinkErrorPolicy::Retain) the snapshot is merged back
/// into the live accumulators and the next cycle retries it together with
/// newer samples; sustained sink failure grows the accumulated totals but
/// loses nothing. Under [`Discard`](SinkErrorPolicy::Discard) the snapshot
/// is dropped, keeping memory bounded at the cost of the failed window. A
/// batch that failed partway through may repeat already-appended entries
/// after recovery under `Retain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkErrorPolicy {
    /// Merge the failed snapshot back and retry it next cycle.
    #[default]
    Retain,
    /// Drop the failed snapshot.
    Discard,
}

/// Tuning knobs for a [`Collector`].
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use telemetria::{CollectorOptions, SinkErrorPolicy};
///
/// let options = CollectorOptions::new()
///     .with_flush_interval(Duration::from_millis(250))
///     .with_sink_error_policy(SinkErrorPolicy::Discard);
///
/// assert_eq!(options.flush_interval, Duration::from_millis(250));
/// assert_eq!(options.on_sink_error, SinkErrorPolicy::Discard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOptions {
    /// Period of the background flush loop. Defaults to one second.
    pub flush_interval: Duration,
    /// Snapshot handling when the sink fails. Defaults to
    /// [`SinkErrorPolicy::Retain`].
    pub on_sink_error: SinkErrorPolicy,
}

impl CollectorOptions {
    /// Creates the default options: one-second flushes, retain on failure.
    pub const fn new() -> Self {
        CollectorOptions {
            flush_interval: Duration::from_secs(1),
            on_sink_error: SinkErrorPolicy::Retain,
        }
    }

    /// Sets the background flush period, returning `self` for chaining.
    pub const fn with_flush_interval(self, flush_interval: Duration) -> Self {
        Self { flush_interval, ..self }
    }

    /// Sets the sink failure policy, returning `self` for chaining.
    pub const fn with_sink_error_policy(self, on_sink_error: SinkErrorPolicy) -> Self {
        Self { on_sink_error, ..self }
    }
}

impl Default for CollectorOptions {
    /// Creates the default options.
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the collector handle and its background thread.
struct Shared {
    registry: MetricRegistry,
    writer: Mutex<MetricWriter>,
    options: CollectorOptions,
    running: AtomicBool,
    last_flush: AtomicOptionInstant,
}

impl Shared {
    /// Runs one flush cycle: snapshot every metric, write the batch, record
    /// the completion instant.
    ///
    /// The writer lock is held for the whole cycle, serializing manual
    /// flushes against the background loop so cycle N's write and reset
    /// fully precede cycle N+1's snapshots. Metric locks are taken one at a
    /// time and released before the write.
    fn flush_cycle(&self) {
        let mut writer = self.writer.lock();
        let timestamp = clock::now();

        let metrics = self.registry.list_all();
        let mut drained: Vec<(Arc<Metric>, MetricValue)> = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if let Some(snapshot) = metric.snapshot_and_reset() {
                drained.push((metric, snapshot));
            }
        }

        if !drained.is_empty() {
            let entries: Vec<MetricEntry> = drained
                .iter()
                .map(|(metric, value)| MetricEntry::new(timestamp, metric.name(), *value))
                .collect();

            if let Err(err) = writer.write_entries(&entries) {
                error!(%err, entries = entries.len(), "failed to persist metrics batch");
                if self.options.on_sink_error == SinkErrorPolicy::Retain {
                    for (metric, snapshot) in &drained {
                        if let Err(err) = metric.merge_back(snapshot) {
                            warn!(metric = metric.name(), %err, "failed to retain samples after sink failure");
                        }
                    }
                }
            }
        }

        self.last_flush.store(Some(Instant::now()), Ordering::Relaxed);
    }
}

/// Handle to the running background thread.
struct Worker {
    shutdown: Sender<()>,
    join: JoinHandle<()>,
}

/// Background loop: flush once per interval until the shutdown channel
/// signals or disconnects.
///
/// Waiting on the channel doubles as the timer, so `stop` interrupts a wait
/// immediately instead of sleeping it out. The wait after each cycle is the
/// interval minus the cycle's own duration, clamped to zero, so cadence
/// drifts gracefully under load instead of accumulating backlog.
fn flush_loop(shared: Arc<Shared>, shutdown: Receiver<()>) {
    let interval = shared.options.flush_interval;
    let mut wait = interval;
    loop {
        match shutdown.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                let cycle_start = Instant::now();
                shared.flush_cycle();
                wait = interval.saturating_sub(cycle_start.elapsed());
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// The accumulation-and-flush pipeline behind one sink.
///
/// Producers call [`record`](Self::record) from any thread; a background
/// thread started by [`start`](Self::start) periodically drains every
/// registered metric and persists one line per non-empty metric through the
/// writer. Metrics can be registered up front to fix their kind, or left to
/// auto-registration by the first recorded value.
///
/// # Examples
///
/// ```rust
/// use telemetria::{BufferSink, Collector, MetricWriter, ValueKind};
///
/// let sink = BufferSink::new();
/// let collector = Collector::new(MetricWriter::new(sink.clone()));
///
/// collector.register("CPU", ValueKind::Float).unwrap();
/// collector.start();
///
/// collector.record("CPU", 0.5);
/// collector.record("CPU", 1.0);
///
/// collector.flush();
/// collector.stop();
///
/// assert_eq!(sink.len(), 1);
/// assert!(sink.lines()[0].ends_with("\"CPU\" 0.75"));
/// ```
pub struct Collector {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl Collector {
    /// Creates an idle collector over `writer` with default options.
    pub fn new(writer: MetricWriter) -> Self {
        Self::with_options(writer, CollectorOptions::new())
    }

    /// Creates an idle collector over `writer` with the given options.
    pub fn with_options(writer: MetricWriter, options: CollectorOptions) -> Self {
        Collector {
            shared: Arc::new(Shared {
                registry: MetricRegistry::new(),
                writer: Mutex::new(writer),
                options,
                running: AtomicBool::new(false),
                last_flush: AtomicOptionInstant::none(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Returns the collector's registry.
    pub fn registry(&self) -> &MetricRegistry {
        &self.shared.registry
    }

    /// Returns the options this collector was built with.
    pub fn options(&self) -> &CollectorOptions {
        &self.shared.options
    }

    /// Registers a metric up front, fixing its name and kind.
    ///
    /// Fails synchronously with an invalid-name or name-conflict error;
    /// auto-registration via [`record`](Self::record) never reports these to
    /// producers.
    pub fn register(&self, name: &str, kind: ValueKind) -> Result<Arc<Metric>> {
        self.shared.registry.register(name, kind)
    }

    /// Returns `true` while the background flush thread is active.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Starts the background flush thread. A no-op if already running.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let join = thread::spawn(move || flush_loop(shared, shutdown_rx));
        *worker = Some(Worker {
            shutdown: shutdown_tx,
            join,
        });
        debug!(interval = ?self.shared.options.flush_interval, "collector started");
    }

    /// Stops the background thread and flushes once more.
    ///
    /// Signals the flush loop, joins it, then runs one final synchronous
    /// cycle so every sample recorded before the stop reaches the sink. A
    /// no-op if already idle. The collector may be started again afterwards.
    pub fn stop(&self) {
        let mut worker_slot = self.worker.lock();
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(worker) = worker_slot.take() {
            let _ = worker.shutdown.send(());
            if worker.join.join().is_err() {
                error!("flush thread panicked");
            }
        }
        drop(worker_slot);

        self.shared.flush_cycle();
        debug!("collector stopped");
    }

    /// Records one sample under `name`.
    ///
    /// While idle the sample is silently dropped. While running, an
    /// unregistered name is auto-registered with the sample's inferred kind;
    /// the first sample thereby fixes the metric's reduction policy, and
    /// later samples of an incompatible kind are logged and dropped without
    /// disturbing other producers. This call never blocks on I/O and never
    /// returns an error.
    ///
    /// A record racing with a concurrent [`stop`](Self::stop) may land after
    /// the final flush; the sample stays accumulated and is reported by the
    /// first cycle after the next [`start`](Self::start).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::{BufferSink, Collector, MetricWriter, ValueKind};
    ///
    /// let sink = BufferSink::new();
    /// let collector = Collector::new(MetricWriter::new(sink.clone()));
    /// collector.start();
    ///
    /// collector.record("load", 0.97);      // auto-registered as float
    /// collector.record("load", 3u64);      // mismatched kind, dropped
    ///
    /// collector.stop();
    /// assert_eq!(sink.len(), 1);
    /// assert!(sink.lines()[0].ends_with("\"load\" 0.97"));
    /// ```
    #[inline]
    pub fn record(&self, name: &str, value: impl Into<Sample>) {
        if !self.shared.running.load(Ordering::SeqCst) {
            return;
        }

        let sample = value.into();
        let metric = match self.shared.registry.get_or_register(name, sample.kind()) {
            Ok(metric) => metric,
            Err(err) => {
                warn!(name, %err, "dropping sample for unregistrable metric");
                return;
            }
        };

        if let Err(err) = metric.record(sample) {
            warn!(name, %err, "dropping sample with mismatched kind");
        }
    }

    /// Flushes all accumulated samples synchronously from this thread.
    ///
    /// A no-op while idle. Does not reschedule the background loop; the next
    /// periodic flush happens at its usual time.
    pub fn flush(&self) {
        if !self.is_running() {
            return;
        }
        self.shared.flush_cycle();
    }

    /// Returns when the most recent flush cycle completed, if any.
    ///
    /// A growing gap between now and this instant means the sink is slow or
    /// stuck.
    pub fn last_flush_at(&self) -> Option<Instant> {
        self.shared.last_flush.load(Ordering::Relaxed)
    }
}

impl Drop for Collector {
    /// Stops the collector if it is still running.
    fn drop(&mut self) {
        self.stop();
    }
}

impl Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("running", &self.is_running())
            .field("metrics", &self.shared.registry.len())
            .field("options", &self.shared.options)
            .finish()
    }
}

/// Scope guard that keeps a collector running.
///
/// Starts the wrapped collector on construction and stops it (including the
/// final flush) when dropped, on every exit path. Derefs to [`Collector`],
/// so recording goes through the guard directly.
///
/// # Examples
///
/// ```rust
/// use telemetria::{BufferSink, Collector, MetricWriter, ScopedCollector};
///
/// let sink = BufferSink::new();
/// let collector = ScopedCollector::new(Collector::new(MetricWriter::new(sink.clone())));
///
/// collector.record("requests", 10u64);
/// drop(collector);
///
/// assert_eq!(sink.len(), 1);
/// ```
pub struct ScopedCollector {
    collector: Collector,
}

impl ScopedCollector {
    /// Wraps `collector` and starts it.
    pub fn new(collector: Collector) -> Self {
        collector.start();
        ScopedCollector { collector }
    }
}

impl Deref for ScopedCollector {
    type Target = Collector;

    fn deref(&self) -> &Collector {
        &self.collector
    }
}

impl Drop for ScopedCollector {
    /// Stops the collector, flushing whatever accumulated.
    fn drop(&mut self) {
        self.collector.stop();
    }
}

impl Debug for ScopedCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCollector")
            .field("collector", &self.collector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{BufferSink, Sink};
    use std::io;

    // Long enough that the background loop never fires during a test; all
    // flushes below are driven manually.
    const MANUAL: Duration = Duration::from_secs(3600);

    fn manual_collector(sink: BufferSink) -> Collector {
        Collector::with_options(
            MetricWriter::new(sink),
            CollectorOptions::new().with_flush_interval(MANUAL),
        )
    }

    /// Sink that can be switched between working and failing.
    #[derive(Clone)]
    struct FlakySink {
        healthy: Arc<AtomicBool>,
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl FlakySink {
        fn new() -> Self {
            FlakySink {
                healthy: Arc::new(AtomicBool::new(true)),
                lines: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().clone()
        }
    }

    impl Sink for FlakySink {
        fn append(&mut self, line: &str) -> io::Result<()> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "sink offline"));
            }
            self.lines.lock().push(line.to_string());
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            if !self.healthy.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "sink offline"));
            }
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_options_defaults() {
        let options = CollectorOptions::default();
        assert_eq!(options.flush_interval, Duration::from_secs(1));
        assert_eq!(options.on_sink_error, SinkErrorPolicy::Retain);
    }

    #[test]
    fn test_record_while_idle_is_dropped() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());

        collector.record("hits", 1u64);
        assert!(collector.registry().is_empty());

        collector.start();
        collector.flush();
        collector.stop();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_fractional_metric_flushes_mean() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.register("CPU", ValueKind::Float).unwrap();
        collector.start();

        collector.record("CPU", 0.5);
        collector.record("CPU", 1.0);
        collector.flush();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"CPU\" 0.75"));

        // The accumulator is empty after the flush.
        assert_eq!(collector.registry().lookup("CPU").unwrap().sample_count(), 0);
        collector.stop();
    }

    #[test]
    fn test_integral_metric_flushes_sum() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.register("HTTP", ValueKind::Signed).unwrap();
        collector.start();

        collector.record("HTTP", 10i64);
        collector.record("HTTP", 20i64);
        collector.flush();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"HTTP\" 30"));
        collector.stop();
    }

    #[test]
    fn test_quiet_metric_produces_no_entry() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.register("busy", ValueKind::Unsigned).unwrap();
        collector.register("quiet", ValueKind::Unsigned).unwrap();
        collector.start();

        collector.record("busy", 1u64);
        collector.flush();
        assert_eq!(sink.len(), 1);
        assert!(sink.lines()[0].contains("\"busy\""));

        // A cycle with nothing recorded writes nothing at all.
        collector.flush();
        assert_eq!(sink.len(), 1);
        collector.stop();
    }

    #[test]
    fn test_register_conflict() {
        let collector = manual_collector(BufferSink::new());
        collector.register("CPU", ValueKind::Float).unwrap();
        let err = collector.register("CPU", ValueKind::Float).unwrap_err();
        assert!(matches!(err, crate::MetricError::NameConflict(_)));
    }

    #[test]
    fn test_auto_registration_fixes_kind() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.start();

        collector.record("load", 0.5);
        let metric = collector.registry().lookup("load").unwrap();
        assert_eq!(metric.kind(), ValueKind::Float);

        // A mismatched later sample is dropped, the first value survives.
        collector.record("load", 3u64);
        collector.flush();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"load\" 0.50"));
        collector.stop();
    }

    #[test]
    fn test_record_invalid_name_dropped_silently() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.start();

        collector.record("bad\"name", 1u64);
        assert!(collector.registry().is_empty());

        collector.flush();
        collector.stop();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_entries_share_cycle_timestamp() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.start();

        collector.record("a", 1u64);
        collector.record("b", 2u64);
        collector.flush();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        let prefix_len = "2025-06-01 15:00:01.653".len();
        assert_eq!(lines[0][..prefix_len], lines[1][..prefix_len]);
        collector.stop();
    }

    #[test]
    fn test_concurrent_records_no_lost_updates() {
        let sink = BufferSink::new();
        let collector = Arc::new(manual_collector(sink.clone()));
        collector.start();

        let mut handles = vec![];
        for _ in 0..4 {
            let collector_clone = Arc::clone(&collector);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    collector_clone.record("hits", 1u64);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.registry().lookup("hits").unwrap().sample_count(), 400);

        collector.stop();
        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"hits\" 400"));
    }

    #[test]
    fn test_stop_flushes_remaining_samples() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());
        collector.start();

        for i in 1..=5u64 {
            collector.record("hits", i);
        }
        collector.stop();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"hits\" 15"));
    }

    #[test]
    fn test_start_stop_idempotent() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());

        assert!(!collector.is_running());
        collector.start();
        collector.start();
        assert!(collector.is_running());

        collector.record("hits", 1u64);
        collector.stop();
        collector.stop();
        assert!(!collector.is_running());

        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());

        collector.start();
        collector.record("hits", 1u64);
        collector.stop();

        collector.start();
        assert!(collector.is_running());
        collector.record("hits", 2u64);
        collector.stop();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("\"hits\" 1"));
        assert!(lines[1].ends_with("\"hits\" 2"));
    }

    #[test]
    fn test_sample_landing_after_final_flush_survives_restart() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());

        collector.start();
        collector.record("hits", 1u64);
        let metric = collector.registry().lookup("hits").unwrap();
        collector.stop();
        assert!(sink.lines()[0].ends_with("\"hits\" 1"));

        // A producer that passed the running check just before stop
        // completed lands after the final flush; the sample stays in the
        // accumulator until the next start.
        metric.record(2u64).unwrap();
        assert_eq!(metric.sample_count(), 1);

        collector.start();
        collector.flush();
        collector.stop();

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("\"hits\" 2"));
    }

    #[test]
    fn test_flush_while_idle_is_noop() {
        let sink = BufferSink::new();
        let collector = manual_collector(sink.clone());

        collector.start();
        collector.record("hits", 1u64);
        collector.stop();
        assert_eq!(sink.len(), 1);

        // Idle: nothing accumulates and flush does nothing.
        collector.flush();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_background_loop_flushes() {
        let sink = BufferSink::new();
        let collector = Collector::with_options(
            MetricWriter::new(sink.clone()),
            CollectorOptions::new().with_flush_interval(Duration::from_millis(20)),
        );
        collector.start();
        collector.record("hits", 1u64);

        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        collector.stop();

        assert!(!sink.is_empty());
        assert!(sink.lines()[0].ends_with("\"hits\" 1"));
    }

    #[test]
    fn test_drop_while_running_stops_and_flushes() {
        let sink = BufferSink::new();
        {
            let collector = manual_collector(sink.clone());
            collector.start();
            collector.record("hits", 3u64);
        }
        assert_eq!(sink.len(), 1);
        assert!(sink.lines()[0].ends_with("\"hits\" 3"));
    }

    #[test]
    fn test_sink_failure_retains_samples() {
        let sink = FlakySink::new();
        let collector = Collector::with_options(
            MetricWriter::new(sink.clone()),
            CollectorOptions::new().with_flush_interval(MANUAL),
        );
        collector.start();
        collector.record("hits", 10u64);

        sink.set_healthy(false);
        collector.flush();
        assert!(sink.lines().is_empty());
        assert_eq!(collector.registry().lookup("hits").unwrap().sample_count(), 1);

        // Samples recorded between failure and retry are folded in.
        collector.record("hits", 5u64);
        sink.set_healthy(true);
        collector.flush();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"hits\" 15"));
        collector.stop();
    }

    #[test]
    fn test_sink_failure_discard_policy() {
        let sink = FlakySink::new();
        let collector = Collector::with_options(
            MetricWriter::new(sink.clone()),
            CollectorOptions::new()
                .with_flush_interval(MANUAL)
                .with_sink_error_policy(SinkErrorPolicy::Discard),
        );
        collector.start();
        collector.record("hits", 10u64);

        sink.set_healthy(false);
        collector.flush();
        assert_eq!(collector.registry().lookup("hits").unwrap().sample_count(), 0);

        sink.set_healthy(true);
        collector.flush();
        assert!(sink.lines().is_empty());
        collector.stop();
    }

    #[test]
    fn test_last_flush_at() {
        let collector = manual_collector(BufferSink::new());
        assert!(collector.last_flush_at().is_none());

        collector.start();
        collector.flush();
        let first = collector.last_flush_at().unwrap();

        collector.flush();
        let second = collector.last_flush_at().unwrap();
        assert!(second >= first);
        collector.stop();
    }

    #[test]
    fn test_scoped_collector_starts_and_stops() {
        let sink = BufferSink::new();
        let scoped = ScopedCollector::new(manual_collector(sink.clone()));
        assert!(scoped.is_running());

        scoped.record("requests", 10u64);
        scoped.record("requests", 20u64);
        drop(scoped);

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("\"requests\" 30"));
    }

    #[test]
    fn test_scoped_collector_register() {
        let sink = BufferSink::new();
        let scoped = ScopedCollector::new(manual_collector(sink.clone()));
        scoped.register("CPU", ValueKind::Float).unwrap();
        scoped.record("CPU", 0.5);
        drop(scoped);

        assert!(sink.lines()[0].ends_with("\"CPU\" 0.50"));
    }
}
