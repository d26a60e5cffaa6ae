//! Unified error type for the telemetry pipeline.
//!
//! This module provides [`MetricError`], the single error type returned by
//! registration, recording and writing operations, so client code can handle
//! failures from any stage of the pipeline uniformly.

use thiserror::Error;

use crate::value::ValueKind;

/// Unified error type for all telemetry operations.
///
/// Registration errors ([`InvalidName`](MetricError::InvalidName),
/// [`NameConflict`](MetricError::NameConflict)) are surfaced synchronously to
/// the caller. Recording and flushing errors are contained by the collector:
/// they are logged and the offending sample or batch is handled locally,
/// never propagated into producer threads.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The metric name is empty or contains quote/control characters.
    #[error("invalid metric name {0:?}")]
    InvalidName(String),

    /// A metric with this name is already registered.
    #[error("metric {0:?} is already registered")]
    NameConflict(String),

    /// A recorded value's kind disagrees with the metric's established kind.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// The kind the metric was registered with.
        expected: ValueKind,
        /// The kind of the rejected value.
        found: ValueKind,
    },

    /// The sink failed to persist a batch.
    #[error("sink failure: {0}")]
    Sink(#[from] std::io::Error),

    /// The writer was used after `close()`.
    #[error("writer is closed")]
    SinkClosed,
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_name() {
        let err = MetricError::InvalidName("bad\nname".to_string());
        assert_eq!(format!("{}", err), "invalid metric name \"bad\\nname\"");
    }

    #[test]
    fn test_display_name_conflict() {
        let err = MetricError::NameConflict("CPU".to_string());
        assert_eq!(format!("{}", err), "metric \"CPU\" is already registered");
    }

    #[test]
    fn test_display_type_mismatch() {
        let err = MetricError::TypeMismatch {
            expected: ValueKind::Float,
            found: ValueKind::Unsigned,
        };
        assert_eq!(format!("{}", err), "type mismatch: expected float, got unsigned");
    }

    #[test]
    fn test_sink_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = MetricError::from(io_err);
        assert!(matches!(err, MetricError::Sink(_)));
        assert_eq!(format!("{}", err), "sink failure: disk full");
    }
}
