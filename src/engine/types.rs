//! Core Fill Types, Identifiers, and Index Layouts
//!
//! This module defines the **fundamental identifiers, index types and
//! capacity constants** shared by every part of the fill engine: axes, storage,
//! the fill histogram, the finalizer and the driver.
//!
//! ## Index conventions
//!
//! Two bin-index conventions coexist in the engine:
//!
//! ```text
//! internal (fill object)   | -1 | 0 | 1 | ... | n-1 | n  |
//! external (result object) |  0 | 1 | 2 | ... |  n  | n+1|
//!                           under                      over
//! ```
//!
//! - **Internal** indices are zero-based per dimension; the underflow bin (if
//!   the axis models one) is `-1` and the overflow bin is `n`.
//! - **External** indices are one-based per dimension; underflow is `0` and
//!   overflow is `n + 1`.
//!
//! The mapping is a fixed `+1` applied to every dimension independently
//! (see [`to_external`]). Dimensions are never reordered.
//!
//! ## Capacities
//!
//! Multi-indices are stored in small inline vectors sized by [`MAX_RANK`], so
//! that per-fill coordinate and index handling never touches the heap for
//! realistic histogram ranks.

use smallvec::SmallVec;


/// Identifier of a worker slot handed in by the driving framework.
///
/// Accepted for interface symmetry with replica-based helpers; the shared fill
/// object makes it irrelevant for correctness.
pub type SlotId = u32;

/// Signed per-dimension bin index. Internal indices use `-1` for underflow.
pub type BinIndex = i32;

/// Linear offset of a bin (or tensor leaf) inside dense storage.
pub type Offset = usize;

/// Maximum number of inline dimensions (fill rank + tensor rank) kept on the stack.
pub const MAX_RANK: usize = 8;

/// Maximum number of arguments accepted for a single event.
pub const MAX_ARGS: usize = 8;

const _: [(); 1] = [(); (MAX_RANK >= 3) as usize];
const _: [(); 1] = [(); (MAX_ARGS >= 1) as usize];

/// Inline multi-index used for both internal and external bin addressing.
pub type MultiIndex = SmallVec<[BinIndex; MAX_RANK]>;

/// Inline coordinate list for one (broadcast) event instance.
pub type Coords = SmallVec<[f64; MAX_RANK]>;

/// Identifier returned by [`crate::engine::action::Action::name`].
pub const HELPER_NAME: &str = "FillHist";

/// Variation tag used when no explicit tag was requested.
pub const NOMINAL_VARIATION: &str = "nominal";

/// Converts an internal (zero-based) bin index into the external (one-based)
/// convention.
#[inline]
pub const fn to_external(internal: BinIndex) -> BinIndex {
    internal + 1
}

/// Converts an external (one-based) bin index back into the internal convention.
#[inline]
pub const fn to_internal(external: BinIndex) -> BinIndex {
    external - 1
}
