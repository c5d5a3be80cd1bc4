//! # histfill
//!
//! Concurrent fill-and-transfer engine for multi-dimensional histograms.
//!
//! Many worker threads fill **one shared histogram** through atomic bin
//! updates; there are no per-thread replicas and no merge pass. When filling
//! is over, every bin is transferred into an externally indexed result
//! histogram.
//!
//! ## Design Goals
//! - Lock-free concurrent filling with atomic storage
//! - Compile-time scalar vs. sequence classification of event arguments
//! - Element-wise broadcasting with up-front validation (no partial fills)
//! - Scalar and tensor-valued accumulators
//! - Explicit lifecycle: construct, exec, finalize exactly once
//!
//! ## Example
//! ```rust
//! use histfill::prelude::*;
//!
//! let fill: FillHistogram<AtomicWeightStorage> =
//!     FillHistogram::new(vec![Axis::regular(3, 0.0, 3.0).unwrap()]).unwrap();
//! let result = Hist3::for_layout(fill.layout()).unwrap();
//! let mut helper = FillHelper::new(result, fill).unwrap();
//!
//! helper.exec(0, (0.5,)).unwrap();
//! helper.exec(0, (1.5, 1.5)).unwrap();
//! helper.finalize().unwrap();
//!
//! let h = helper.result();
//! let h = h.read().unwrap();
//! assert_eq!(h.content(&[2]), 1.5);
//! assert_eq!(h.error(&[2]), 1.5);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;
pub mod profiling;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Binning

pub use engine::axis::{
    Axis,
    AxisOptions,
    AxisSet,
};

pub use engine::tensor::{
    Shape,
    WeightTensor,
};

// Storage and accumulators

pub use engine::accumulator::{
    AccumulatorKind,
    BinValue,
    Count,
    WeightedSum,
};

pub use engine::storage::{
    Storage,
    AtomicCountStorage,
    AtomicWeightStorage,
    CountStorage,
    WeightStorage,
};

// Filling

pub use engine::args::{
    Arg,
    FillArg,
    FillArgs,
    Sequence,
    Value,
};

pub use engine::weight::{combine, CombinedWeight};

pub use engine::histogram::{
    FillHistogram,
    FillLayout,
};

// Lifecycle and transfer

pub use engine::action::{Action, WorkerContext};

pub use engine::helper::{
    FillHelper,
    FillOwnership,
    HelperState,
    ResultHandle,
};

pub use engine::transfer::{bin_entries, BinEntry};

pub use engine::result::{
    FillView,
    Hist3,
    HistN,
    ResultHistogram,
};

pub use engine::scheduler::{
    run_events,
    run_sequential,
    RunConfig,
    RunReport,
};

pub use engine::threading::{
    enable_implicit_mt,
    disable_implicit_mt,
    is_implicit_mt_enabled,
    ImplicitMtGuard,
};

pub use engine::error::{
    FillResult,
    FillError,
    AxisError,
    ConcurrencyUnsupportedError,
    InvalidInputError,
};

pub use engine::types::{
    BinIndex,
    SlotId,
    MultiIndex,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used fill types.
///
/// Import with:
/// ```rust
/// use histfill::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Action,
        AtomicCountStorage,
        AtomicWeightStorage,
        Axis,
        AxisOptions,
        FillError,
        FillHelper,
        FillHistogram,
        FillLayout,
        FillResult,
        Hist3,
        HistN,
        ResultHistogram,
        Shape,
        WeightTensor,
    };
}
