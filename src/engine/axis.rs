//! Axis definitions and bin location.
//!
//! An [`Axis`] maps a coordinate to a signed, zero-based bin index; an
//! [`AxisSet`] combines several axes into a dense, linearised index space used
//! by the fill histogram's storage.
//!
//! ## Index layout
//!
//! Each axis covers `extent()` storage slots:
//!
//! ```text
//! slot   0        1   ...  n       n+1
//! index  -1       0   ...  n-1     n
//!        (under)                   (over)
//! ```
//!
//! Flow slots only exist when enabled in [`AxisOptions`]. The linear offset of
//! a multi-index is computed first-axis-fastest:
//!
//! ```text
//! offset = s0 + e0 * (s1 + e1 * (s2 + ...))
//! ```
//!
//! where `s_i` is the storage slot and `e_i` the extent of axis `i`.
//!
//! Values that fall outside the axis and have no flow slot to land in are
//! *dropped*: [`Axis::index`] returns `None` and the fill is skipped.

use crate::engine::error::AxisError;
use crate::engine::types::{BinIndex, MultiIndex, Offset, MAX_RANK};

/// Largest number of regular bins on one axis. Leaves room for the overflow
/// index `n` in a [`BinIndex`].
pub const MAX_BINS: usize = BinIndex::MAX as usize - 1;

fn check_bins(bins: u64) -> Result<(), AxisError> {
    if bins > MAX_BINS as u64 {
        return Err(AxisError::TooManyBins { bins });
    }
    Ok(())
}

/// Under/overflow modelling of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOptions {
    /// Keep an underflow bin at index `-1`.
    pub underflow: bool,

    /// Keep an overflow bin at index `n`.
    pub overflow: bool,
}

impl Default for AxisOptions {
    fn default() -> Self {
        Self { underflow: true, overflow: true }
    }
}

impl AxisOptions {
    /// Axis without flow bins.
    pub const NONE: AxisOptions = AxisOptions { underflow: false, overflow: false };
}

/// One binning dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    /// `bins` equal-width bins over `[lo, hi)`.
    Regular {
        /// Number of bins.
        bins: usize,
        /// Lower edge of the first bin.
        lo: f64,
        /// Upper edge of the last bin.
        hi: f64,
        /// Flow options.
        options: AxisOptions,
    },

    /// Bins delimited by explicit, strictly increasing edges.
    Variable {
        /// Bin edges, `len = bins + 1`.
        edges: Vec<f64>,
        /// Flow options.
        options: AxisOptions,
    },

    /// One bin per integer in `[lo, hi)`.
    Integer {
        /// First integer value.
        lo: i64,
        /// One past the last integer value.
        hi: i64,
        /// Flow options.
        options: AxisOptions,
    },
}

impl Axis {
    /// Regular axis with both flow bins.
    pub fn regular(bins: usize, lo: f64, hi: f64) -> Result<Self, AxisError> {
        Self::regular_with(bins, lo, hi, AxisOptions::default())
    }

    /// Regular axis with explicit flow options.
    pub fn regular_with(bins: usize, lo: f64, hi: f64, options: AxisOptions) -> Result<Self, AxisError> {
        if bins == 0 {
            return Err(AxisError::NoBins);
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(AxisError::InvalidRange { lo, hi });
        }
        check_bins(bins as u64)?;
        Ok(Axis::Regular { bins, lo, hi, options })
    }

    /// Variable-width axis with both flow bins.
    pub fn variable(edges: Vec<f64>) -> Result<Self, AxisError> {
        Self::variable_with(edges, AxisOptions::default())
    }

    /// Variable-width axis with explicit flow options.
    pub fn variable_with(edges: Vec<f64>, options: AxisOptions) -> Result<Self, AxisError> {
        if edges.len() < 2 {
            return Err(AxisError::NoBins);
        }
        if let Some(bad) = edges.iter().position(|e| !e.is_finite()) {
            return Err(AxisError::UnsortedEdges { position: bad });
        }
        if let Some(bad) = edges.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AxisError::UnsortedEdges { position: bad + 1 });
        }
        check_bins(edges.len() as u64 - 1)?;
        Ok(Axis::Variable { edges, options })
    }

    /// Integer axis with both flow bins.
    pub fn integer(lo: i64, hi: i64) -> Result<Self, AxisError> {
        Self::integer_with(lo, hi, AxisOptions::default())
    }

    /// Integer axis with explicit flow options.
    pub fn integer_with(lo: i64, hi: i64, options: AxisOptions) -> Result<Self, AxisError> {
        if hi <= lo {
            return Err(AxisError::InvalidRange { lo: lo as f64, hi: hi as f64 });
        }
        // i128 keeps the width exact for any pair of i64 bounds
        let width = hi as i128 - lo as i128;
        check_bins(u64::try_from(width).unwrap_or(u64::MAX))?;
        Ok(Axis::Integer { lo, hi, options })
    }

    /// Number of regular bins (excluding flow bins).
    pub fn size(&self) -> usize {
        match self {
            Axis::Regular { bins, .. } => *bins,
            Axis::Variable { edges, .. } => edges.len() - 1,
            // bounded by MAX_BINS at construction
            Axis::Integer { lo, hi, .. } => (*hi as i128 - *lo as i128) as usize,
        }
    }

    /// Flow options of this axis.
    pub fn options(&self) -> AxisOptions {
        match self {
            Axis::Regular { options, .. }
            | Axis::Variable { options, .. }
            | Axis::Integer { options, .. } => *options,
        }
    }

    /// Number of storage slots including flow bins.
    #[inline]
    pub fn extent(&self) -> usize {
        let o = self.options();
        self.size() + o.underflow as usize + o.overflow as usize
    }

    /// First valid internal index (`-1` with underflow, else `0`).
    #[inline]
    pub fn first_index(&self) -> BinIndex {
        if self.options().underflow { -1 } else { 0 }
    }

    /// Locates `x`.
    ///
    /// Returns the internal index (`-1` underflow, `n` overflow) or `None` when
    /// the value falls into a flow region the axis does not model. NaN is
    /// treated as overflow.
    pub fn index(&self, x: f64) -> Option<BinIndex> {
        let n = self.size() as BinIndex;
        let raw: BinIndex = match self {
            Axis::Regular { bins, lo, hi, .. } => {
                if x.is_nan() || x >= *hi {
                    n
                } else if x < *lo {
                    -1
                } else {
                    let z = (x - lo) / (hi - lo);
                    ((z * *bins as f64) as BinIndex).min(n - 1)
                }
            }
            Axis::Variable { edges, .. } => {
                if x.is_nan() || x >= edges[edges.len() - 1] {
                    n
                } else if x < edges[0] {
                    -1
                } else {
                    // partition_point gives the first edge > x
                    edges.partition_point(|e| *e <= x) as BinIndex - 1
                }
            }
            Axis::Integer { lo, hi, .. } => {
                if x.is_nan() {
                    n
                } else {
                    let v = x.floor();
                    if v < *lo as f64 {
                        -1
                    } else if v >= *hi as f64 {
                        n
                    } else {
                        (v as i128 - *lo as i128) as BinIndex
                    }
                }
            }
        };

        let o = self.options();
        match raw {
            -1 if !o.underflow => None,
            i if i == n && !o.overflow => None,
            i => Some(i),
        }
    }

    /// Storage slot of an internal index.
    #[inline]
    fn slot(&self, index: BinIndex) -> usize {
        (index - self.first_index()) as usize
    }
}

/// Ordered set of axes defining the fill rank.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSet {
    axes: Vec<Axis>,
    strides: Vec<usize>,
    total: usize,
}

impl AxisSet {
    /// Builds an axis set. At least one axis is required.
    pub fn new(axes: Vec<Axis>) -> Result<Self, AxisError> {
        if axes.is_empty() {
            return Err(AxisError::NoBins);
        }
        if axes.len() > MAX_RANK {
            return Err(AxisError::RankTooLarge { rank: axes.len() });
        }

        let mut strides = Vec::with_capacity(axes.len());
        let mut total = 1usize;
        for axis in &axes {
            strides.push(total);
            total = total.checked_mul(axis.extent()).ok_or(AxisError::StorageOverflow)?;
        }
        Ok(Self { axes, strides, total })
    }

    /// Number of axes (coordinates consumed per event).
    #[inline]
    pub fn rank(&self) -> usize {
        self.axes.len()
    }

    /// Total number of storage slots including flow bins.
    #[inline]
    pub fn total_bins(&self) -> usize {
        self.total
    }

    /// The axes in order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Linear offset for `coords`, or `None` if any coordinate is dropped.
    ///
    /// `coords.len()` must equal the rank.
    #[inline]
    pub fn locate(&self, coords: &[f64]) -> Option<Offset> {
        debug_assert_eq!(coords.len(), self.rank());
        let mut offset = 0;
        for ((axis, stride), x) in self.axes.iter().zip(&self.strides).zip(coords) {
            let index = axis.index(*x)?;
            offset += axis.slot(index) * stride;
        }
        Some(offset)
    }

    /// Inverse of [`AxisSet::locate`]: internal multi-index of a linear offset.
    pub fn multi_index(&self, mut offset: Offset) -> MultiIndex {
        let mut out = MultiIndex::with_capacity(self.rank());
        for axis in &self.axes {
            let e = axis.extent();
            out.push((offset % e) as BinIndex + axis.first_index());
            offset /= e;
        }
        out
    }

    /// Linear offset of an internal multi-index, if it lies inside the set.
    pub fn offset_of(&self, index: &[BinIndex]) -> Option<Offset> {
        if index.len() != self.rank() {
            return None;
        }
        let mut offset = 0;
        for ((axis, stride), i) in self.axes.iter().zip(&self.strides).zip(index) {
            let lo = axis.first_index();
            let hi = lo + axis.extent() as BinIndex;
            if *i < lo || *i >= hi {
                return None;
            }
            offset += axis.slot(*i) * stride;
        }
        Some(offset)
    }
}
