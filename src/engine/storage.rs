//! Dense accumulator storage with declared threading capability.
//!
//! This module implements the flat arrays that back a
//! [`FillHistogram`](crate::engine::histogram::FillHistogram). Every storage
//! holds one leaf per `(bin, tensor leaf)` pair and is updated through a shared
//! reference, so the histogram can be filled via `&self`.
//!
//! # What this module provides
//!
//! - **[`Storage`]**: the capability trait. Besides `add`/`get` it declares
//!   [`Storage::HAS_THREADING_SUPPORT`], which the helper checks at
//!   construction time against the implicit multi-threading policy.
//! - **Atomic backends**: [`AtomicCountStorage`] and [`AtomicWeightStorage`].
//!   Concurrent fills to the same leaf are resolved by the atomic primitive
//!   alone; there is no lock, batching or per-thread replica.
//! - **Single-threaded backends**: [`CountStorage`] and [`WeightStorage`],
//!   built on [`Cell`]. They are `!Sync`, so the compiler already refuses to
//!   share them between threads; the runtime capability check covers
//!   frameworks that would drive them from several threads anyway.
//!
//! # Storage model
//!
//! ```text
//! offset = bin_offset * leaves_per_bin + leaf
//! ```
//!
//! `leaves_per_bin` is `1` for scalar accumulators and the tensor's element
//! count for tensor-valued accumulators.
//!
//! # Atomic floating-point accumulation
//!
//! `f64` sums are kept as raw bits in [`AtomicU64`] and updated with a
//! compare-exchange loop. `value` and `sum_of_weight_squares` are two
//! independent atomics: each converges to the exact total, but a reader racing
//! with writers may observe one updated before the other. Readers are only
//! expected after all fills have quiesced.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::accumulator::{AccumulatorKind, BinValue, Count, WeightedSum};
use crate::engine::types::Offset;


/// Dense leaf storage of a fill histogram.
///
/// Storages own their leaves, hence the `'static` bound.
pub trait Storage: 'static {
    /// `true` if [`Storage::add`] is safe and lossless under concurrent calls.
    const HAS_THREADING_SUPPORT: bool;

    /// Leaf kind accumulated by this storage.
    const KIND: AccumulatorKind;

    /// Allocates `len` zeroed leaves.
    fn with_len(len: usize) -> Self
    where
        Self: Sized;

    /// Number of leaves.
    fn len(&self) -> usize;

    /// Returns `true` when the storage holds no leaves.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds one weighted fill to leaf `offset`.
    ///
    /// Count storages ignore `weight`.
    fn add(&self, offset: Offset, weight: f64);

    /// Snapshot of leaf `offset`.
    fn get(&self, offset: Offset) -> BinValue;

    /// Human-readable storage name for diagnostics.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Lock-free `f64` accumulation on top of [`AtomicU64`].
#[inline]
fn atomic_add_f64(cell: &AtomicU64, delta: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f64::from_bits(current) + delta).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return,
            Err(observed) => {
                current = observed;
                std::hint::spin_loop();
            }
        }
    }
}

/// Thread-safe count storage.
///
/// Each leaf is one [`AtomicU64`] incremented with `fetch_add`.
pub struct AtomicCountStorage {
    cells: Box<[AtomicU64]>,
}

impl Storage for AtomicCountStorage {
    const HAS_THREADING_SUPPORT: bool = true;
    const KIND: AccumulatorKind = AccumulatorKind::Count;

    fn with_len(len: usize) -> Self {
        Self { cells: (0..len).map(|_| AtomicU64::new(0)).collect() }
    }

    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn add(&self, offset: Offset, _weight: f64) {
        self.cells[offset].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self, offset: Offset) -> BinValue {
        BinValue::Count(Count(self.cells[offset].load(Ordering::Acquire)))
    }
}

/// Pair of atomics backing one weighted leaf.
struct AtomicWeightCell {
    value: AtomicU64,
    sum_of_weight_squares: AtomicU64,
}

impl AtomicWeightCell {
    fn zero() -> Self {
        Self {
            value: AtomicU64::new(0f64.to_bits()),
            sum_of_weight_squares: AtomicU64::new(0f64.to_bits()),
        }
    }
}

/// Thread-safe weighted-sum storage.
pub struct AtomicWeightStorage {
    cells: Box<[AtomicWeightCell]>,
}

impl Storage for AtomicWeightStorage {
    const HAS_THREADING_SUPPORT: bool = true;
    const KIND: AccumulatorKind = AccumulatorKind::WeightedSum;

    fn with_len(len: usize) -> Self {
        Self { cells: (0..len).map(|_| AtomicWeightCell::zero()).collect() }
    }

    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn add(&self, offset: Offset, weight: f64) {
        let cell = &self.cells[offset];
        atomic_add_f64(&cell.value, weight);
        atomic_add_f64(&cell.sum_of_weight_squares, weight * weight);
    }

    #[inline]
    fn get(&self, offset: Offset) -> BinValue {
        let cell = &self.cells[offset];
        BinValue::WeightedSum(WeightedSum {
            value: f64::from_bits(cell.value.load(Ordering::Acquire)),
            sum_of_weight_squares: f64::from_bits(cell.sum_of_weight_squares.load(Ordering::Acquire)),
        })
    }
}

/// Single-threaded count storage.
pub struct CountStorage {
    cells: Box<[Cell<Count>]>,
}

impl Storage for CountStorage {
    const HAS_THREADING_SUPPORT: bool = false;
    const KIND: AccumulatorKind = AccumulatorKind::Count;

    fn with_len(len: usize) -> Self {
        Self { cells: (0..len).map(|_| Cell::new(Count::default())).collect() }
    }

    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn add(&self, offset: Offset, _weight: f64) {
        let cell = &self.cells[offset];
        let mut c = cell.get();
        c.push();
        cell.set(c);
    }

    #[inline]
    fn get(&self, offset: Offset) -> BinValue {
        BinValue::Count(self.cells[offset].get())
    }
}

/// Single-threaded weighted-sum storage.
pub struct WeightStorage {
    cells: Box<[Cell<WeightedSum>]>,
}

impl Storage for WeightStorage {
    const HAS_THREADING_SUPPORT: bool = false;
    const KIND: AccumulatorKind = AccumulatorKind::WeightedSum;

    fn with_len(len: usize) -> Self {
        Self { cells: (0..len).map(|_| Cell::new(WeightedSum::default())).collect() }
    }

    #[inline]
    fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn add(&self, offset: Offset, weight: f64) {
        let cell = &self.cells[offset];
        let mut w = cell.get();
        w.push(weight);
        cell.set(w);
    }

    #[inline]
    fn get(&self, offset: Offset) -> BinValue {
        BinValue::WeightedSum(self.cells[offset].get())
    }
}

macro_rules! storage_debug {
    ($($ty:ty),*) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty)).field("len", &self.len()).finish()
            }
        }
    )*};
}

storage_debug!(AtomicCountStorage, AtomicWeightStorage, CountStorage, WeightStorage);
