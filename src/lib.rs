//! # Telemetria - Concurrent Metric Accumulation and Periodic Flush
//!
//! A Rust library for collecting numeric telemetry inside a running process
//! and persisting it to an append-only sink as human-readable, timestamped
//! lines. Producers record raw samples from any thread; a background thread
//! periodically reduces each metric to a single value and writes one line
//! per metric per cycle.
//!
//! ## The Problem
//!
//! Instrumented code wants to say "the CPU load was 0.97 just now" or "we
//! served another 42 requests" and move on. It must not wait for a disk
//! write, contend with other threads recording unrelated metrics, or lose
//! samples when the process shuts down. Aggregation, formatting and
//! durability belong somewhere else.
//!
//! ## The Design
//!
//! 1. **Per-metric locking**: every [`Metric`] guards its accumulator with
//!    its own lock, padded to a private cache line via
//!    [`crossbeam_utils::CachePadded`]. Recording to one metric never
//!    contends with recording to another, and never touches the sink.
//!
//! 2. **Kind-driven reduction**: a metric's [`ValueKind`] decides how its
//!    samples collapse into the flushed value. Fractional metrics report
//!    the mean of the window, integral metrics report the sum. The kind is
//!    fixed at registration and samples of the wrong kind are rejected.
//!
//! 3. **Snapshot-and-reset windows**: each flush cycle atomically takes a
//!    metric's accumulated state and leaves it empty, so every sample is
//!    reported exactly once and each output line covers exactly one
//!    interval. Metrics with no samples in the window produce no line.
//!
//! 4. **I/O outside the locks**: the flush cycle drains all metrics first,
//!    then hands the whole batch to the writer. A slow or stuck sink delays
//!    the flush cadence but never blocks producers.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`MetricValue`] | Accumulated reduction state (sum and sample count) |
//! | [`Metric`] | Named accumulator with its own lock |
//! | [`MetricRegistry`] | Name-to-metric map with validated, exclusive registration |
//! | [`Collector`] | Lifecycle, hot recording path and the background flush loop |
//! | [`MetricWriter`] | Formats entries and appends them durably to a [`Sink`] |
//!
//! ## Output Format
//!
//! Each flushed entry is one line: a local-time timestamp with millisecond
//! precision, the quoted metric name, and the reduced value. Fractional
//! values carry exactly two decimal places.
//!
//! ```text
//! 2025-06-01 15:00:01.653 "CPU" 0.97
//! 2025-06-01 15:00:01.653 "HTTP requests RPS" 1250
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use telemetria::{BufferSink, Collector, MetricWriter, ValueKind};
//!
//! let sink = BufferSink::new();
//! let collector = Collector::new(MetricWriter::new(sink.clone()));
//!
//! // Fix the kind up front, or let the first sample decide it.
//! collector.register("CPU", ValueKind::Float).unwrap();
//! collector.start();
//!
//! collector.record("CPU", 0.97);
//! collector.record("CPU", 0.51);
//! collector.record("requests", 10u64);
//!
//! collector.flush();
//! collector.stop();
//!
//! let lines = sink.lines();
//! assert_eq!(lines.len(), 2);
//! assert!(lines.iter().any(|line| line.ends_with("\"CPU\" 0.74")));
//! assert!(lines.iter().any(|line| line.ends_with("\"requests\" 10")));
//! ```
//!
//! Writing to a file instead of a buffer:
//!
//! ```rust,no_run
//! use telemetria::{Collector, MetricWriter};
//!
//! # fn main() -> telemetria::Result<()> {
//! let writer = MetricWriter::to_file("metrics.log")?;
//! let collector = Collector::new(writer);
//! collector.start();
//! collector.record("CPU", 0.97);
//! collector.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! [`Collector`] is `Send + Sync`; share it across threads with
//! `Arc<Collector>` or borrow it from the owning scope. Recording is O(1)
//! under the target metric's lock, and concurrent records to the same
//! metric are all accumulated with none lost.
//!
//! ## Lifecycle
//!
//! A collector starts idle. [`start`](Collector::start) spawns the flush
//! thread (default cadence: one second), [`stop`](Collector::stop) joins
//! it and flushes one final time, and both are idempotent. Samples
//! recorded while idle are dropped. Dropping a running collector stops
//! it; [`ScopedCollector`] ties the running state to a scope.
//!
//! ## Logging
//!
//! The library emits diagnostics through [`tracing`]: dropped samples and
//! skipped entries at `warn`, sink failures at `error`, lifecycle
//! transitions at `debug`. It never installs a subscriber; embedding
//! applications choose their own.

pub mod clock;
pub mod collector;
pub mod error;
pub mod metric;
pub mod registry;
pub mod value;
pub mod writer;

pub use collector::{Collector, CollectorOptions, ScopedCollector, SinkErrorPolicy};
pub use error::{MetricError, Result};
pub use metric::Metric;
pub use registry::MetricRegistry;
pub use value::{MetricValue, Sample, ValueKind};
pub use writer::{BufferSink, FileSink, MetricEntry, MetricWriter, Sink};
