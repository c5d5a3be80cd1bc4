//! Per-bin accumulator values.
//!
//! This module defines the **plain-data snapshots** of what a bin (or tensor
//! leaf) holds once filling has quiesced. Storage backends in
//! [`crate::engine::storage`] keep the live, possibly atomic, representation;
//! the finalizer reads it back into these types.
//!
//! ## Provided accumulators
//!
//! * [`Count`] – number of fills. The weight value is ignored beyond presence.
//! * [`WeightedSum`] – sum of weights and sum of squared weights.
//!
//! A tensor-valued accumulator is not a separate value type: it is a fixed
//! number of [`Count`] or [`WeightedSum`] leaves stored side by side for each
//! bin (see [`crate::engine::histogram::FillHistogram::tensor_shape`]).
//!
//! ## Design principles
//! The accumulator types are:
//!
//! * **Copy** – snapshots move freely between threads.
//! * **Execution-agnostic** – they know nothing about atomics or axes.

/// Accumulator that counts fills.
///
/// ## Semantics
/// Every fill increments the counter by one regardless of the weight value.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Count(pub u64);

impl Count {
    /// Records one fill.
    #[inline]
    pub fn push(&mut self) {
        self.0 += 1;
    }
}

/// Accumulator of a weighted sum and its variance estimate.
///
/// ## Semantics
/// A fill with weight `w` adds `w` to `value` and `w²` to
/// `sum_of_weight_squares`. The variance reported for the bin is the sum of
/// squared weights, so the uncertainty published at finalize is its square root.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightedSum {
    /// Sum of weights.
    pub value: f64,

    /// Sum of squared weights.
    pub sum_of_weight_squares: f64,
}

impl WeightedSum {
    /// Records one fill with weight `w`.
    #[inline]
    pub fn push(&mut self, w: f64) {
        self.value += w;
        self.sum_of_weight_squares += w * w;
    }

    /// Variance estimate of `value`.
    #[inline]
    pub fn variance(&self) -> f64 {
        self.sum_of_weight_squares
    }
}

/// Which leaf kind a storage accumulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulatorKind {
    /// [`Count`] leaves.
    Count,

    /// [`WeightedSum`] leaves.
    WeightedSum,
}

/// Snapshot of one leaf, as read back by the finalizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BinValue {
    /// Raw fill count.
    Count(Count),

    /// Weighted sum with variance.
    WeightedSum(WeightedSum),
}

impl BinValue {
    /// Content published to the result histogram.
    #[inline]
    pub fn content(&self) -> f64 {
        match self {
            BinValue::Count(c) => c.0 as f64,
            BinValue::WeightedSum(w) => w.value,
        }
    }

    /// Variance published to the result histogram, if the leaf tracks one.
    #[inline]
    pub fn variance(&self) -> Option<f64> {
        match self {
            BinValue::Count(_) => None,
            BinValue::WeightedSum(w) => Some(w.variance()),
        }
    }

    /// Uncertainty, `sqrt(variance)`, if the leaf tracks a variance.
    #[inline]
    pub fn error(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

impl From<Count> for BinValue {
    fn from(c: Count) -> Self { BinValue::Count(c) }
}
impl From<WeightedSum> for BinValue {
    fn from(w: WeightedSum) -> Self { BinValue::WeightedSum(w) }
}
