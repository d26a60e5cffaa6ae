//! Typed metric accumulators and their reduction semantics.
//!
//! This module provides [`MetricValue`], a reducible accumulator over a closed
//! set of numeric kinds, together with [`ValueKind`] (the kind tag) and
//! [`Sample`] (a single in-flight value). The accumulator stores a running
//! total plus a sample count, and the kind decides how the pair reduces to one
//! reported value:
//!
//! | Kind | Reduction | Rendering |
//! |------|-----------|-----------|
//! | [`ValueKind::Float`] | arithmetic mean of samples | fixed 2 decimals |
//! | [`ValueKind::Signed`] | sum of samples | plain decimal |
//! | [`ValueKind::Unsigned`] | sum of samples | plain decimal |
//!
//! The reduction policy is a property of the kind, never a per-instance
//! choice. An accumulator with zero samples renders as `"0"` regardless of
//! kind.

use std::fmt::{self, Display};

use crate::error::{MetricError, Result};

/// The numeric kind of a metric, fixing its reduction policy.
///
/// Fractional metrics reduce to the mean of their samples, integral metrics
/// to the sum. The kind is fixed when a metric is registered (explicitly or
/// by the first recorded value) and cannot change afterwards.
///
/// # Examples
///
/// ```rust
/// use telemetria::value::ValueKind;
///
/// assert_eq!(format!("{}", ValueKind::Float), "float");
/// assert_eq!(format!("{}", ValueKind::Signed), "signed");
/// assert_eq!(format!("{}", ValueKind::Unsigned), "unsigned");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 64-bit floating point; reduces to the arithmetic mean.
    Float,
    /// Signed 64-bit integer; reduces to the sum.
    Signed,
    /// Unsigned 64-bit integer; reduces to the sum.
    Unsigned,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Float => f.write_str("float"),
            ValueKind::Signed => f.write_str("signed"),
            ValueKind::Unsigned => f.write_str("unsigned"),
        }
    }
}

/// A single recorded value, tagged with its numeric kind.
///
/// Samples are produced implicitly via `From` conversions from the common
/// primitive widths, so call sites pass literals directly:
///
/// ```rust
/// use telemetria::value::{Sample, ValueKind};
///
/// assert_eq!(Sample::from(0.75).kind(), ValueKind::Float);
/// assert_eq!(Sample::from(-3i64).kind(), ValueKind::Signed);
/// assert_eq!(Sample::from(42u32).kind(), ValueKind::Unsigned);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A floating-point sample.
    Float(f64),
    /// A signed integer sample.
    Signed(i64),
    /// An unsigned integer sample.
    Unsigned(u64),
}

impl Sample {
    /// Returns the numeric kind of this sample.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Sample::Float(_) => ValueKind::Float,
            Sample::Signed(_) => ValueKind::Signed,
            Sample::Unsigned(_) => ValueKind::Unsigned,
        }
    }
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Sample::Float(value)
    }
}

impl From<f32> for Sample {
    fn from(value: f32) -> Self {
        Sample::Float(f64::from(value))
    }
}

impl From<i64> for Sample {
    fn from(value: i64) -> Self {
        Sample::Signed(value)
    }
}

impl From<i32> for Sample {
    fn from(value: i32) -> Self {
        Sample::Signed(i64::from(value))
    }
}

impl From<u64> for Sample {
    fn from(value: u64) -> Self {
        Sample::Unsigned(value)
    }
}

impl From<u32> for Sample {
    fn from(value: u32) -> Self {
        Sample::Unsigned(u64::from(value))
    }
}

impl From<usize> for Sample {
    fn from(value: usize) -> Self {
        Sample::Unsigned(value as u64)
    }
}

/// A reducible accumulator holding a running total and a sample count.
///
/// Each variant pairs a kind-specific sum with the number of samples observed
/// since the last reset. Integral sums use wrapping arithmetic so a counter
/// wrap never panics the host.
///
/// # Examples
///
/// A fractional accumulator reduces to the mean:
///
/// ```rust
/// use telemetria::value::{MetricValue, ValueKind};
///
/// let mut value = MetricValue::new(ValueKind::Float);
/// value.observe(0.5.into()).unwrap();
/// value.observe(1.0.into()).unwrap();
///
/// assert_eq!(value.count(), 2);
/// assert_eq!(value.render(), "0.75");
/// ```
///
/// An integral accumulator reduces to the sum:
///
/// ```rust
/// use telemetria::value::{MetricValue, ValueKind};
///
/// let mut value = MetricValue::new(ValueKind::Unsigned);
/// value.observe(10u64.into()).unwrap();
/// value.observe(20u64.into()).unwrap();
///
/// assert_eq!(value.render(), "30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Floating-point accumulator.
    Float {
        /// Running total of observed values.
        sum: f64,
        /// Number of samples since the last reset.
        count: u64,
    },
    /// Signed integer accumulator.
    Signed {
        /// Running total of observed values.
        sum: i64,
        /// Number of samples since the last reset.
        count: u64,
    },
    /// Unsigned integer accumulator.
    Unsigned {
        /// Running total of observed values.
        sum: u64,
        /// Number of samples since the last reset.
        count: u64,
    },
}

impl MetricValue {
    /// Creates an empty accumulator of the given kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::value::{MetricValue, ValueKind};
    ///
    /// let value = MetricValue::new(ValueKind::Signed);
    /// assert!(value.is_empty());
    /// assert_eq!(value.render(), "0");
    /// ```
    pub const fn new(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Float => MetricValue::Float { sum: 0.0, count: 0 },
            ValueKind::Signed => MetricValue::Signed { sum: 0, count: 0 },
            ValueKind::Unsigned => MetricValue::Unsigned { sum: 0, count: 0 },
        }
    }

    /// Returns the numeric kind of this accumulator.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            MetricValue::Float { .. } => ValueKind::Float,
            MetricValue::Signed { .. } => ValueKind::Signed,
            MetricValue::Unsigned { .. } => ValueKind::Unsigned,
        }
    }

    /// Returns the number of samples observed since the last reset.
    #[inline]
    pub const fn count(&self) -> u64 {
        match self {
            MetricValue::Float { count, .. }
            | MetricValue::Signed { count, .. }
            | MetricValue::Unsigned { count, .. } => *count,
        }
    }

    /// Returns `true` if no samples have been observed since the last reset.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Adds one sample to the running total.
    ///
    /// Fails with [`MetricError::TypeMismatch`] if the sample's kind differs
    /// from the accumulator's kind; the accumulator is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::value::{MetricValue, Sample, ValueKind};
    ///
    /// let mut value = MetricValue::new(ValueKind::Float);
    /// assert!(value.observe(Sample::Float(0.5)).is_ok());
    /// assert!(value.observe(Sample::Unsigned(1)).is_err());
    /// assert_eq!(value.count(), 1);
    /// ```
    #[inline]
    pub fn observe(&mut self, sample: Sample) -> Result<()> {
        match (self, sample) {
            (MetricValue::Float { sum, count }, Sample::Float(v)) => {
                *sum += v;
                *count += 1;
                Ok(())
            }
            (MetricValue::Signed { sum, count }, Sample::Signed(v)) => {
                *sum = sum.wrapping_add(v);
                *count += 1;
                Ok(())
            }
            (MetricValue::Unsigned { sum, count }, Sample::Unsigned(v)) => {
                *sum = sum.wrapping_add(v);
                *count += 1;
                Ok(())
            }
            (value, sample) => Err(MetricError::TypeMismatch {
                expected: value.kind(),
                found: sample.kind(),
            }),
        }
    }

    /// Merges another accumulator of the same kind into this one.
    ///
    /// Sums and counts are added, so combining two windows yields the same
    /// reduction as observing all their samples in one window. Fails with
    /// [`MetricError::TypeMismatch`] on a kind mismatch, leaving both sides
    /// untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::value::{MetricValue, ValueKind};
    ///
    /// let mut left = MetricValue::new(ValueKind::Float);
    /// left.observe(0.5.into()).unwrap();
    ///
    /// let mut right = MetricValue::new(ValueKind::Float);
    /// right.observe(1.0.into()).unwrap();
    ///
    /// left.combine(&right).unwrap();
    /// assert_eq!(left.count(), 2);
    /// assert_eq!(left.render(), "0.75");
    /// ```
    pub fn combine(&mut self, other: &MetricValue) -> Result<()> {
        match (self, other) {
            (
                MetricValue::Float { sum, count },
                MetricValue::Float { sum: other_sum, count: other_count },
            ) => {
                *sum += *other_sum;
                *count += *other_count;
                Ok(())
            }
            (
                MetricValue::Signed { sum, count },
                MetricValue::Signed { sum: other_sum, count: other_count },
            ) => {
                *sum = sum.wrapping_add(*other_sum);
                *count += *other_count;
                Ok(())
            }
            (
                MetricValue::Unsigned { sum, count },
                MetricValue::Unsigned { sum: other_sum, count: other_count },
            ) => {
                *sum = sum.wrapping_add(*other_sum);
                *count += *other_count;
                Ok(())
            }
            (value, other) => Err(MetricError::TypeMismatch {
                expected: value.kind(),
                found: other.kind(),
            }),
        }
    }

    /// Zeroes the running total and the sample count, keeping the kind.
    pub fn reset(&mut self) {
        *self = MetricValue::new(self.kind());
    }

    /// Returns the accumulated value, leaving an empty accumulator of the
    /// same kind in its place.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::value::{MetricValue, ValueKind};
    ///
    /// let mut value = MetricValue::new(ValueKind::Unsigned);
    /// value.observe(10u64.into()).unwrap();
    ///
    /// let taken = value.take();
    /// assert_eq!(taken.render(), "10");
    /// assert!(value.is_empty());
    /// ```
    #[inline]
    pub fn take(&mut self) -> MetricValue {
        let kind = self.kind();
        std::mem::replace(self, MetricValue::new(kind))
    }

    /// Renders the reduced value as a human-readable string.
    ///
    /// Fractional accumulators render the mean at fixed 2-decimal precision,
    /// integral accumulators the plain decimal sum. Zero samples render as
    /// `"0"` for every kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use telemetria::value::{MetricValue, ValueKind};
    ///
    /// let mut cpu = MetricValue::new(ValueKind::Float);
    /// assert_eq!(cpu.render(), "0");
    ///
    /// cpu.observe(0.97.into()).unwrap();
    /// assert_eq!(cpu.render(), "0.97");
    /// ```
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }
        match self {
            MetricValue::Float { sum, count } => write!(f, "{:.2}", sum / *count as f64),
            MetricValue::Signed { sum, .. } => write!(f, "{sum}"),
            MetricValue::Unsigned { sum, .. } => write!(f, "{sum}"),
        }
    }
}
