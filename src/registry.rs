//! Concurrent name-to-metric registry.
//!
//! The registry owns every [`Metric`] for the collector's lifetime and hands
//! out `Arc` clones, so references obtained by lookup stay valid even while
//! other threads register new metrics. Insertions take the write lock
//! briefly; lookups and enumeration share the read lock and scale with
//! concurrent readers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{MetricError, Result};
use crate::metric::Metric;
use crate::value::ValueKind;

/// Checks whether a string is acceptable as a metric name.
///
/// Names must be non-empty and free of double quotes and control characters,
/// so they can be emitted between quotes in the sink without any escaping.
///
/// # Examples
///
/// ```rust
/// use telemetria::registry::validate_name;
///
/// assert!(validate_name("HTTP requests RPS").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("bad\"name").is_err());
/// assert!(validate_name("bad\nname").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(|c| c == '"' || c.is_control()) {
        return Err(MetricError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A thread-safe mapping from metric names to metrics.
///
/// Registration validates the name and rejects duplicates; the original
/// metric is never overwritten. Entries are never removed while the owning
/// collector runs, so an `Arc<Metric>` returned by [`lookup`](Self::lookup)
/// remains usable for the registry's entire lifetime.
pub struct MetricRegistry {
    metrics: RwLock<HashMap<String, Arc<Metric>>>,
}

impl MetricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        MetricRegistry {
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new metric under `name` with the given kind.
    ///
    /// Fails with [`MetricError::InvalidName`] on a malformed name and with
    /// [`MetricError::NameConflict`] if the name is already taken; the
    /// existing metric is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::registry::MetricRegistry;
    /// use telemetria::value::ValueKind;
    ///
    /// let registry = MetricRegistry::new();
    /// registry.register("CPU", ValueKind::Float).unwrap();
    /// assert!(registry.register("CPU", ValueKind::Float).is_err());
    /// ```
    pub fn register(&self, name: &str, kind: ValueKind) -> Result<Arc<Metric>> {
        validate_name(name)?;
        let mut metrics = self.metrics.write();
        match metrics.entry(name.to_string()) {
            Entry::Occupied(_) => Err(MetricError::NameConflict(name.to_string())),
            Entry::Vacant(slot) => {
                let metric = Arc::new(Metric::new(name, kind));
                slot.insert(Arc::clone(&metric));
                Ok(metric)
            }
        }
    }

    /// Returns the metric registered under `name`, creating it if absent.
    ///
    /// When two threads race to create the same name, exactly one inserts
    /// and both receive the same metric; the loser's `kind` argument is
    /// ignored. The kind check for recorded values happens at the metric,
    /// not here.
    pub fn get_or_register(&self, name: &str, kind: ValueKind) -> Result<Arc<Metric>> {
        if let Some(metric) = self.lookup(name) {
            return Ok(metric);
        }
        validate_name(name)?;
        let mut metrics = self.metrics.write();
        match metrics.entry(name.to_string()) {
            Entry::Occupied(slot) => Ok(Arc::clone(slot.get())),
            Entry::Vacant(slot) => {
                let metric = Arc::new(Metric::new(name, kind));
                slot.insert(Arc::clone(&metric));
                Ok(metric)
            }
        }
    }

    /// Returns the metric registered under `name`, or `None`.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<Arc<Metric>> {
        self.metrics.read().get(name).cloned()
    }

    /// Returns `true` if a metric is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.read().contains_key(name)
    }

    /// Returns the names of all registered metrics.
    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    /// Returns a point-in-time enumeration of all registered metrics.
    ///
    /// The read lock is held only while cloning the `Arc`s; iteration order
    /// is unspecified but consistent within the returned vector.
    pub fn list_all(&self) -> Vec<Arc<Metric>> {
        self.metrics.read().values().cloned().collect()
    }

    /// Returns the number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    /// Returns `true` if no metrics are registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Removes every registered metric.
    ///
    /// Destructive; intended for shutdown and tests, not for use while a
    /// collector is flushing.
    pub fn clear(&self) {
        self.metrics.write().clear();
    }
}

impl Default for MetricRegistry {
    /// Creates an empty registry.
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.metrics.read();
        f.debug_struct("MetricRegistry")
            .field("len", &metrics.len())
            .finish()
    }
}
