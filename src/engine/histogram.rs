//! The shared, internally indexed fill histogram.
//!
//! [`FillHistogram`] couples an [`AxisSet`] with a dense [`Storage`]. All
//! filling goes through `&self`, so one histogram can be wrapped in an `Arc`
//! and filled by every worker thread at once. With an atomic storage there is
//! no lock anywhere on the fill path: fills to different bins never contend,
//! fills to the same bin are resolved by the storage's atomic update.
//!
//! ## Tensor-valued accumulators
//!
//! With a tensor shape set, each bin owns `shape.numel()` consecutive leaves.
//! A tensor weight updates every leaf with its own component; a scalar (or
//! implicit unit) weight is applied to every leaf.

use std::sync::Arc;

use crate::engine::accumulator::{AccumulatorKind, BinValue};
use crate::engine::args::{broadcast, dispatch, fill_scalars, Arg, EventLayout, FillArgs};
use crate::engine::axis::{Axis, AxisSet};
use crate::engine::error::{AxisError, FillResult};
use crate::engine::storage::Storage;
use crate::engine::tensor::Shape;
use crate::engine::types::{BinIndex, Offset};
use crate::engine::weight::CombinedWeight;

/// Binning and leaf layout of a fill histogram, without storage.
///
/// Cheap to clone; used to allocate fresh fill objects of the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FillLayout {
    axes: Arc<AxisSet>,
    tensor_shape: Option<Shape>,
}

impl FillLayout {
    /// Layout with scalar leaves.
    pub fn new(axes: Vec<Axis>) -> Result<Self, AxisError> {
        Ok(Self { axes: Arc::new(AxisSet::new(axes)?), tensor_shape: None })
    }

    /// Layout with tensor-valued leaves of the given shape.
    pub fn with_tensor(axes: Vec<Axis>, shape: Shape) -> Result<Self, AxisError> {
        let axes = AxisSet::new(axes)?;
        axes.total_bins().checked_mul(shape.numel()).ok_or(AxisError::StorageOverflow)?;
        Ok(Self { axes: Arc::new(axes), tensor_shape: Some(shape) })
    }

    /// The axis set.
    #[inline]
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    /// Tensor shape of each bin, if tensor valued.
    #[inline]
    pub fn tensor_shape(&self) -> Option<&Shape> {
        self.tensor_shape.as_ref()
    }

    /// Fill rank (coordinates per event).
    #[inline]
    pub fn rank(&self) -> usize {
        self.axes.rank()
    }

    /// Rank of the tensor leaves (`0` for scalar leaves).
    #[inline]
    pub fn tensor_rank(&self) -> usize {
        self.tensor_shape.as_ref().map_or(0, Shape::rank)
    }

    /// Fill rank plus tensor rank.
    #[inline]
    pub fn total_rank(&self) -> usize {
        self.rank() + self.tensor_rank()
    }

    /// Leaves stored per bin.
    #[inline]
    pub fn leaves_per_bin(&self) -> usize {
        self.tensor_shape.as_ref().map_or(1, Shape::numel)
    }

    /// Per-dimension regular bin counts: axis sizes, then tensor extents.
    pub fn dims(&self) -> Vec<usize> {
        let mut dims: Vec<usize> = self.axes.axes().iter().map(Axis::size).collect();
        if let Some(shape) = &self.tensor_shape {
            dims.extend_from_slice(shape.dims());
        }
        dims
    }

    fn event_layout(&self) -> EventLayout<'_> {
        EventLayout { rank: self.rank(), tensor_shape: self.tensor_shape.as_ref() }
    }
}

/// Concurrently fillable histogram with zero-based internal indexing.
pub struct FillHistogram<S: Storage> {
    layout: FillLayout,
    storage: S,
}

impl<S: Storage> FillHistogram<S> {
    /// Allocates zeroed storage for `layout`.
    pub fn from_layout(layout: FillLayout) -> Self {
        let storage = S::with_len(layout.axes.total_bins() * layout.leaves_per_bin());
        Self { layout, storage }
    }

    /// Histogram with scalar leaves over `axes`.
    pub fn new(axes: Vec<Axis>) -> Result<Self, AxisError> {
        Ok(Self::from_layout(FillLayout::new(axes)?))
    }

    /// Histogram with tensor-valued leaves over `axes`.
    pub fn with_tensor(axes: Vec<Axis>, shape: Shape) -> Result<Self, AxisError> {
        Ok(Self::from_layout(FillLayout::with_tensor(axes, shape)?))
    }

    /// Layout of this histogram.
    #[inline]
    pub fn layout(&self) -> &FillLayout {
        &self.layout
    }

    /// The axis set.
    #[inline]
    pub fn axes(&self) -> &AxisSet {
        self.layout.axes()
    }

    /// Fill rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// Tensor shape of each bin, if tensor valued.
    #[inline]
    pub fn tensor_shape(&self) -> Option<&Shape> {
        self.layout.tensor_shape()
    }

    /// Leaf kind of the storage.
    #[inline]
    pub fn kind(&self) -> AccumulatorKind {
        S::KIND
    }

    /// Underlying storage.
    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Adds one weighted contribution at `coords`.
    ///
    /// Coordinates outside an axis without the matching flow bin are dropped.
    /// The caller guarantees tensor weights match the layout; see
    /// [`crate::engine::args::validate`].
    #[inline]
    pub fn fill(&self, coords: &[f64], weight: &CombinedWeight<'_>) {
        let Some(bin) = self.layout.axes.locate(coords) else {
            return;
        };
        let leaves = self.layout.leaves_per_bin();
        let base = bin * leaves;

        match weight {
            CombinedWeight::Tensor(t) => {
                for (leaf, w) in t.as_slice().iter().enumerate() {
                    self.storage.add(base + leaf, *w);
                }
            }
            CombinedWeight::Scalar(w) => {
                for leaf in 0..leaves {
                    self.storage.add(base + leaf, *w);
                }
            }
            CombinedWeight::Unit => {
                for leaf in 0..leaves {
                    self.storage.add(base + leaf, 1.0);
                }
            }
        }
    }

    /// Validates, broadcasts and fills one event.
    ///
    /// The entry point is chosen at compile time from
    /// [`FillArgs::HAS_SEQUENCE`].
    pub fn fill_args<A: FillArgs>(&self, args: A) -> FillResult<()> {
        let list = args.descriptors();
        let layout = self.layout.event_layout();
        if A::HAS_SEQUENCE {
            broadcast(&list, layout, |coords, w| self.fill(coords, w))
        } else {
            fill_scalars(&list, layout, |coords, w| self.fill(coords, w))
        }
    }

    /// Validates, broadcasts and fills one event given as runtime descriptors.
    pub fn fill_descriptors(&self, args: &[Arg<'_>]) -> FillResult<()> {
        dispatch(args, self.layout.event_layout(), |coords, w| self.fill(coords, w))
    }

    /// Snapshot of one leaf at an internal multi-index.
    ///
    /// `leaf` is the flat tensor leaf (`0` for scalar leaves).
    pub fn value(&self, index: &[BinIndex], leaf: usize) -> Option<BinValue> {
        if leaf >= self.layout.leaves_per_bin() {
            return None;
        }
        let bin = self.layout.axes.offset_of(index)?;
        Some(self.storage.get(bin * self.layout.leaves_per_bin() + leaf))
    }

    /// Snapshot of a leaf by raw storage offset.
    #[inline]
    pub fn leaf(&self, offset: Offset) -> BinValue {
        self.storage.get(offset)
    }

    /// Sum of all leaf contents, flow bins included.
    pub fn sum(&self) -> f64 {
        (0..self.storage.len()).map(|o| self.storage.get(o).content()).sum()
    }
}

impl<S: Storage> std::fmt::Debug for FillHistogram<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillHistogram")
            .field("layout", &self.layout)
            .field("storage", &S::name())
            .finish()
    }
}
