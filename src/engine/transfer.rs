//! Bin enumeration for the finalize step.
//!
//! Walks every storage slot of a [`FillHistogram`], flow bins included, and
//! produces `(external multi-index, value)` pairs. The walk is a pure read of
//! the fill object; writing into a result histogram is left to
//! [`ResultHistogram::publish`](crate::engine::result::ResultHistogram::publish).
//!
//! ## Index mapping
//!
//! ```text
//! internal (i0, i1, ..)         -> external (i0+1, i1+1, ..)
//! tensor leaf (t0, t1, ..)      -> appended as (t0+1, t1+1, ..)
//! ```
//!
//! so a rank-2 histogram with `(2, 2)` tensor leaves yields rank-4 external
//! indices: leaf `(1, 0)` of internal bin `(0, 0)` becomes `(1, 1, 2, 1)`.

use crate::engine::accumulator::BinValue;
use crate::engine::histogram::FillHistogram;
use crate::engine::storage::Storage;
use crate::engine::types::{to_external, MultiIndex};

/// One externally indexed value produced by the finalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEntry {
    /// One-based multi-index: fill dimensions, then tensor dimensions.
    pub index: MultiIndex,

    /// Snapshot of the leaf.
    pub value: BinValue,
}

/// Calls `f` once per leaf in storage order.
pub fn for_each_entry<S, F>(fill: &FillHistogram<S>, mut f: F)
where
    S: Storage,
    F: FnMut(&[i32], BinValue),
{
    let axes = fill.axes();
    let leaves = fill.layout().leaves_per_bin();
    let mut index = MultiIndex::new();

    for bin in 0..axes.total_bins() {
        index.clear();
        index.extend(axes.multi_index(bin).into_iter().map(to_external));
        let base = bin * leaves;

        match fill.tensor_shape() {
            None => f(index.as_slice(), fill.leaf(base)),
            Some(shape) => {
                let fill_rank = index.len();
                for (leaf, sub) in shape.indices().enumerate() {
                    index.truncate(fill_rank);
                    index.extend(sub.into_iter().map(to_external));
                    f(index.as_slice(), fill.leaf(base + leaf));
                }
            }
        }
    }
}

/// Every leaf of `fill` with its external multi-index.
pub fn bin_entries<S: Storage>(fill: &FillHistogram<S>) -> Vec<BinEntry> {
    let mut out = Vec::with_capacity(fill.storage().len());
    for_each_entry(fill, |index, value| {
        out.push(BinEntry { index: MultiIndex::from_slice(index), value });
    });
    out
}
