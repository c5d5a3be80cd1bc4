//! Error types for histogram construction, filling and finalization.
//!
//! This module declares focused, composable error types used across the fill
//! engine. Each error carries enough context to make a rejected event or a
//! refused construction actionable, while remaining cheap to pass around and
//! convert into the aggregate [`FillError`].
//!
//! ## Failure classes
//! * **Construction** – [`ConcurrencyUnsupportedError`] and [`AxisError`] are
//!   fatal: the pipeline must not start.
//! * **Per event** – [`InvalidInputError`] rejects a single event. No bin has
//!   been touched when it is returned, so the event can simply be discarded.
//! * **Defects** – [`FillError::InternalInvariantViolation`] signals a bug in
//!   the engine rather than a user error.
//! * **Lifecycle misuse** – filling after, or finalizing twice.
//!
//! ## Typical flow
//! Low-level helpers (axis validation, argument classification, weight
//! combination) return their dedicated error types. The helper surface uses
//! `?` to bubble them into [`FillError`]:
//! ```ignore
//! fn exec<A: FillArgs>(&self, slot: SlotId, args: A) -> FillResult<()> {
//!     let fill = self.fill_object()?;   // FillError::Finalized
//!     fill.fill_args(args)?;            // InvalidInputError -> FillError
//!     Ok(())
//! }
//! ```
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is short and suitable for operator logs.
//! * [`fmt::Debug`] (derived) keeps full structure for diagnostics.

use std::fmt;


/// Returned at construction when multi-threading is enabled but the storage
/// chosen for the fill object cannot be updated atomically.
///
/// Running concurrent non-atomic increments would lose updates silently, which
/// is worse than refusing to start.
///
/// ### Fields
/// * `storage` – Type name of the offending storage.
/// * `threads` – Worker pool size reported by the threading policy.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyUnsupportedError {

    /// Type name of the storage lacking threading support.
    pub storage: &'static str,

    /// Number of worker threads configured when the check ran.
    pub threads: usize,
}

impl fmt::Display for ConcurrencyUnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "multithreading is enabled ({} threads) but storage {} is not thread-safe",
            self.threads, self.storage
        )
    }
}

impl std::error::Error for ConcurrencyUnsupportedError {}

/// Rejection of a single event's arguments.
///
/// Returned before any bin is updated; a rejected event leaves the fill object
/// untouched.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {

    /// Two sequence arguments of the same event disagree in length.
    LengthMismatch {
        /// Position of the offending argument in the event.
        argument: usize,

        /// Length of the first sequence argument.
        expected: usize,

        /// Length reported by the offending argument.
        found: usize,
    },

    /// The event carried fewer values than the histogram rank.
    MissingCoordinates {
        /// Number of coordinates the axis set consumes.
        rank: usize,

        /// Number of arguments supplied.
        given: usize,
    },

    /// A tensor was supplied where a coordinate was expected.
    NonScalarCoordinate {
        /// Position of the offending argument in the event.
        argument: usize,
    },

    /// Two tensor weight components were multiplied.
    TensorProduct,

    /// A tensor weight does not match the histogram's tensor shape.
    TensorShapeMismatch {
        /// Shape declared by the fill histogram (empty for scalar accumulators).
        expected: Vec<usize>,

        /// Shape of the supplied weight.
        found: Vec<usize>,
    },

    /// The event carried more arguments than the engine supports.
    TooManyArguments {
        /// Number of arguments supplied.
        given: usize,
    },
}

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInputError::LengthMismatch { argument, expected, found } => write!(
                f,
                "cannot fill histogram with values in containers of different sizes (argument {argument}: {found} values, expected {expected})"
            ),
            InvalidInputError::MissingCoordinates { rank, given } => {
                write!(f, "histogram of rank {rank} needs at least {rank} values, got {given}")
            }
            InvalidInputError::NonScalarCoordinate { argument } => {
                write!(f, "argument {argument} is a tensor but is used as a coordinate")
            }
            InvalidInputError::TensorProduct => {
                f.write_str("product of two tensor weights is not supported")
            }
            InvalidInputError::TensorShapeMismatch { expected, found } => {
                write!(f, "tensor weight shape {found:?} does not match accumulator shape {expected:?}")
            }
            InvalidInputError::TooManyArguments { given } => {
                write!(f, "{given} arguments exceed the per-event limit")
            }
        }
    }
}

impl std::error::Error for InvalidInputError {}

/// Returned when an axis is constructed with inconsistent binning.

#[derive(Debug, Clone, PartialEq)]
pub enum AxisError {

    /// The axis would contain no bins.
    NoBins,

    /// Axis bounds are not finite or not strictly increasing.
    InvalidRange {
        /// Lower bound.
        lo: f64,

        /// Upper bound.
        hi: f64,
    },

    /// Variable bin edges are not strictly increasing at the given position.
    UnsortedEdges {
        /// Index of the first edge that is not greater than its predecessor.
        position: usize,
    },

    /// The axis set exceeds the supported rank.
    RankTooLarge {
        /// Requested rank.
        rank: usize,
    },

    /// The tensor shape is empty or contains a zero extent.
    InvalidShape,

    /// An axis has more bins than a [`BinIndex`](crate::engine::types::BinIndex) can address.
    TooManyBins {
        /// Requested number of bins.
        bins: u64,
    },

    /// The product of all axis extents overflows the storage index.
    StorageOverflow,
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisError::NoBins => f.write_str("axis must have at least one bin"),
            AxisError::InvalidRange { lo, hi } => write!(f, "invalid axis range [{lo}, {hi})"),
            AxisError::UnsortedEdges { position } => {
                write!(f, "bin edges must be strictly increasing (edge {position})")
            }
            AxisError::RankTooLarge { rank } => write!(f, "rank {rank} exceeds supported maximum"),
            AxisError::InvalidShape => f.write_str("tensor shape must be non-empty with non-zero extents"),
            AxisError::TooManyBins { bins } => write!(f, "{bins} bins exceed the addressable bin index range"),
            AxisError::StorageOverflow => f.write_str("combined axis extents overflow the storage size"),
        }
    }
}

impl std::error::Error for AxisError {}

/// Aggregate error of the fill engine.
///
/// Conversions (`From<T>`) exist for every low-level error so callers can use
/// `?` and still return a single type.

#[derive(Debug, Clone, PartialEq)]
pub enum FillError {

    /// Multi-threading is active but the storage lacks atomic updates.
    ConcurrencyUnsupported(ConcurrencyUnsupportedError),

    /// An event was rejected.
    InvalidInput(InvalidInputError),

    /// An internal assumption did not hold. Indicates a defect in the engine.
    InternalInvariantViolation(&'static str),

    /// An axis or tensor shape could not be constructed.
    Axis(AxisError),

    /// `exec` was called after `finalize` released the fill object.
    Finalized,

    /// `finalize` was called a second time.
    AlreadyFinalized,

    /// The result lock was poisoned by a panicking writer.
    ResultPoisoned,

    /// The result histogram cannot hold the fill histogram's dimensions.
    RankMismatch {
        /// Fill rank plus tensor rank.
        expected: usize,

        /// Rank the result object supports.
        found: usize,
    },

    /// The result histogram has the right rank but different bin counts.
    ExtentMismatch {
        /// Regular bins per dimension of the fill histogram.
        expected: Vec<usize>,

        /// Regular bins per dimension of the result object.
        found: Vec<usize>,
    },

    /// The driver could not build its worker pool.
    ThreadPool(String),
}

impl fmt::Display for FillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillError::ConcurrencyUnsupported(e) => write!(f, "{e}"),
            FillError::InvalidInput(e) => write!(f, "invalid input: {e}"),
            FillError::InternalInvariantViolation(what) => {
                write!(f, "internal invariant violated: {what}")
            }
            FillError::Axis(e) => write!(f, "{e}"),
            FillError::Finalized => f.write_str("fill object already released by finalize"),
            FillError::AlreadyFinalized => f.write_str("finalize called more than once"),
            FillError::ResultPoisoned => f.write_str("result histogram lock poisoned"),
            FillError::RankMismatch { expected, found } => {
                write!(f, "result histogram of rank {found} cannot receive {expected} dimensions")
            }
            FillError::ExtentMismatch { expected, found } => {
                write!(f, "result histogram bins {found:?} do not match fill bins {expected:?}")
            }
            FillError::ThreadPool(msg) => write!(f, "failed to build worker pool: {msg}"),
        }
    }
}

impl std::error::Error for FillError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FillError::ConcurrencyUnsupported(e) => Some(e),
            FillError::InvalidInput(e) => Some(e),
            FillError::Axis(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConcurrencyUnsupportedError> for FillError {
    fn from(e: ConcurrencyUnsupportedError) -> Self { FillError::ConcurrencyUnsupported(e) }
}
impl From<InvalidInputError> for FillError {
    fn from(e: InvalidInputError) -> Self { FillError::InvalidInput(e) }
}
impl From<AxisError> for FillError {
    fn from(e: AxisError) -> Self { FillError::Axis(e) }
}

/// Result alias used throughout the engine.
pub type FillResult<T> = Result<T, FillError>;
