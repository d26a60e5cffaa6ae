//! Named metric with a lock-guarded accumulator.
//!
//! A [`Metric`] pairs an immutable name with a [`MetricValue`] behind its own
//! mutex, so contention is confined to producers recording into the same
//! metric. The lock is cache-line padded to keep independent metrics from
//! false-sharing when they are stored side by side.

use std::fmt::{self, Debug};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::error::Result;
use crate::value::{MetricValue, Sample, ValueKind};

/// A named accumulator with a fixed numeric kind.
///
/// The name and kind are immutable after construction; only the accumulated
/// value changes. `record` and `snapshot_and_reset` each take the metric's
/// own lock for a few instructions and never perform I/O, so producers racing
/// with the flush cycle see every record either entirely before or entirely
/// after a given snapshot.
///
/// # Examples
///
/// ```rust
/// use telemetria::metric::Metric;
/// use telemetria::value::ValueKind;
///
/// let cpu = Metric::new("CPU", ValueKind::Float);
/// cpu.record(0.5).unwrap();
/// cpu.record(1.0).unwrap();
///
/// let snapshot = cpu.snapshot_and_reset().unwrap();
/// assert_eq!(snapshot.render(), "0.75");
/// assert_eq!(cpu.sample_count(), 0);
/// ```
pub struct Metric {
    name: String,
    kind: ValueKind,
    value: CachePadded<Mutex<MetricValue>>,
}

impl Metric {
    /// Creates an empty metric with the given name and kind.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Metric {
            name: name.into(),
            kind,
            value: CachePadded::new(Mutex::new(MetricValue::new(kind))),
        }
    }

    /// Returns the metric's name. Lock-free.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the metric's numeric kind. Lock-free.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Records one sample into the accumulator.
    ///
    /// O(1) under the metric's own lock; the registry is never touched. Fails
    /// with a type mismatch if the sample's kind differs from the metric's,
    /// leaving the accumulator untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::metric::Metric;
    /// use telemetria::value::ValueKind;
    ///
    /// let hits = Metric::new("hits", ValueKind::Unsigned);
    /// hits.record(10u64).unwrap();
    /// assert!(hits.record(0.5).is_err());
    /// assert_eq!(hits.sample_count(), 1);
    /// ```
    #[inline]
    pub fn record(&self, value: impl Into<Sample>) -> Result<()> {
        let sample = value.into();
        self.value.lock().observe(sample)
    }

    /// Atomically reads the accumulated value and resets it to empty.
    ///
    /// Returns `None` if no samples were recorded since the last reset, so a
    /// quiet metric produces no flush entry. Read and reset happen in a
    /// single critical section; a concurrent `record` lands either in the
    /// returned snapshot or in the fresh accumulator, never in both or
    /// neither.
    pub fn snapshot_and_reset(&self) -> Option<MetricValue> {
        let mut value = self.value.lock();
        if value.is_empty() {
            None
        } else {
            Some(value.take())
        }
    }

    /// Merges a previously taken snapshot back into the live accumulator.
    ///
    /// Used when a flush failed and its samples should survive for the next
    /// cycle's retry. Samples recorded in the meantime are preserved.
    pub(crate) fn merge_back(&self, snapshot: &MetricValue) -> Result<()> {
        self.value.lock().combine(snapshot)
    }

    /// Returns the number of samples accumulated since the last reset.
    pub fn sample_count(&self) -> u64 {
        self.value.lock().count()
    }
}

impl Debug for Metric {
    /// Formats the metric showing its name, kind and current accumulator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &*self.value.lock())
            .finish()
    }
}
