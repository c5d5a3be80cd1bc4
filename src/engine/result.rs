//! Externally indexed result histograms.
//!
//! A result histogram is what the caller reads once filling is over. It uses
//! one-based per-dimension indices (`0` underflow, `n + 1` overflow) and is
//! written exactly once, by [`ResultHistogram::publish`] during finalize.
//!
//! ## Provided result types
//!
//! * [`Hist3`] – fixed one-, two- or three-dimensional histogram with a flat
//!   `bin = i + (nx+2) * (j + (ny+2) * k)` layout. Out-of-range indices are
//!   clamped onto the flow bins. Errors are kept as a sum of squares once
//!   [`Hist3::sumw2`] is enabled.
//! * [`HistN`] – histogram of arbitrary rank addressed by a full multi-index.
//! * [`FillView`] – the fill histogram itself, for helpers whose result *is*
//!   the fill object. Publishing to it is a no-op.

use std::any::Any;
use std::sync::Arc;

use crate::engine::accumulator::{AccumulatorKind, BinValue};
use crate::engine::error::{FillError, FillResult};
use crate::engine::histogram::{FillHistogram, FillLayout};
use crate::engine::storage::Storage;
use crate::engine::transfer::for_each_entry;
use crate::engine::types::{to_internal, BinIndex};


/// Destination of the finalize transfer.
pub trait ResultHistogram {
    /// Number of external dimensions.
    fn rank(&self) -> usize;

    /// Whether a fill histogram of `rank` total dimensions (fill rank plus
    /// tensor rank) can be published here.
    fn accepts_rank(&self, rank: usize) -> bool {
        rank == self.rank()
    }

    /// Regular bins per dimension, flow bins excluded.
    fn extents(&self) -> Vec<usize>;

    /// Switches the histogram into sum-of-squared-weights mode.
    fn enable_sumw2(&mut self);

    /// Writes one leaf at a one-based multi-index.
    fn set_entry(&mut self, index: &[BinIndex], value: &BinValue);

    /// `true` if this result object is the fill object itself.
    fn aliases_fill(&self) -> bool {
        false
    }

    /// The fill histogram this result object is, when it uses storage `S`.
    fn shared_fill<S: Storage>(&self) -> Option<Arc<FillHistogram<S>>>
    where
        Self: Sized,
    {
        None
    }

    /// Transfers every leaf of `fill`, flow bins included.
    ///
    /// Returns the number of leaves written.
    fn publish<S: Storage>(&mut self, fill: &FillHistogram<S>) -> FillResult<usize>
    where
        Self: Sized,
    {
        check_layout(&*self, fill.layout())?;
        if self.aliases_fill() {
            return Ok(0);
        }
        if S::KIND == AccumulatorKind::WeightedSum {
            self.enable_sumw2();
        }

        let mut written = 0;
        for_each_entry(fill, |index, value| {
            self.set_entry(index, &value);
            written += 1;
        });
        Ok(written)
    }
}

/// Checks that `result` can hold every leaf of a fill histogram of `layout`:
/// same total rank, same regular bin count on every dimension.
pub fn check_layout<R: ResultHistogram>(result: &R, layout: &FillLayout) -> FillResult<()> {
    let rank = layout.total_rank();
    if !result.accepts_rank(rank) {
        return Err(FillError::RankMismatch { expected: rank, found: result.rank() });
    }
    let expected = layout.dims();
    let found = result.extents();
    if expected != found {
        return Err(FillError::ExtentMismatch { expected, found });
    }
    Ok(())
}

/// One- to three-dimensional result histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Hist3 {
    bins: [usize; 3],
    dimension: usize,
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
}

impl Hist3 {
    fn with_dims(bins: [usize; 3], dimension: usize) -> Self {
        let len = (bins[0] + 2) * (bins[1] + 2) * (bins[2] + 2);
        Self { bins, dimension, contents: vec![0.0; len], sumw2: None }
    }

    /// One-dimensional histogram with `nx` bins.
    pub fn new_1d(nx: usize) -> Self {
        Self::with_dims([nx, 0, 0], 1)
    }

    /// Two-dimensional histogram.
    pub fn new_2d(nx: usize, ny: usize) -> Self {
        Self::with_dims([nx, ny, 0], 2)
    }

    /// Three-dimensional histogram.
    pub fn new_3d(nx: usize, ny: usize, nz: usize) -> Self {
        Self::with_dims([nx, ny, nz], 3)
    }

    /// Histogram matching the dimensions of a fill layout.
    pub fn for_layout(layout: &FillLayout) -> FillResult<Self> {
        match layout.dims().as_slice() {
            [nx] => Ok(Self::new_1d(*nx)),
            [nx, ny] => Ok(Self::new_2d(*nx, *ny)),
            [nx, ny, nz] => Ok(Self::new_3d(*nx, *ny, *nz)),
            dims => Err(FillError::RankMismatch { expected: dims.len(), found: 3 }),
        }
    }

    /// Number of dimensions (1 to 3).
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Regular bins along `axis` (0-based axis number).
    pub fn n_bins(&self, axis: usize) -> usize {
        self.bins.get(axis).copied().unwrap_or(0)
    }

    /// Global bin of a one-based `(i, j, k)`; unused dimensions are ignored
    /// and out-of-range indices are clamped to the flow bins.
    pub fn bin(&self, i: BinIndex, j: BinIndex, k: BinIndex) -> usize {
        let clamp = |v: BinIndex, n: usize| v.clamp(0, n as BinIndex + 1) as usize;
        let nx = self.bins[0] + 2;
        let ny = self.bins[1] + 2;
        let x = clamp(i, self.bins[0]);
        match self.dimension {
            1 => x,
            2 => x + nx * clamp(j, self.bins[1]),
            _ => x + nx * (clamp(j, self.bins[1]) + ny * clamp(k, self.bins[2])),
        }
    }

    /// Content of a global bin.
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or(0.0)
    }

    /// Error of a global bin: `sqrt(sumw2)` in sum-of-squares mode, else
    /// `sqrt(|content|)`.
    pub fn bin_error(&self, bin: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2.get(bin).copied().unwrap_or(0.0).sqrt(),
            None => self.bin_content(bin).abs().sqrt(),
        }
    }

    /// Sets the content of a global bin.
    pub fn set_bin_content(&mut self, bin: usize, content: f64) {
        if let Some(c) = self.contents.get_mut(bin) {
            *c = content;
        }
    }

    /// Sets the error of a global bin; stored squared.
    pub fn set_bin_error(&mut self, bin: usize, error: f64) {
        self.sumw2();
        if let Some(w2) = self.sumw2.as_mut().and_then(|w| w.get_mut(bin)) {
            *w2 = error * error;
        }
    }

    /// Enables sum-of-squares error storage, seeded from the current contents.
    pub fn sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.contents.iter().map(|c| c.abs()).collect());
        }
    }

    /// Returns `true` in sum-of-squares mode.
    pub fn has_sumw2(&self) -> bool {
        self.sumw2.is_some()
    }

    /// Sum of in-range contents (flow bins excluded).
    pub fn integral(&self) -> f64 {
        let nx = self.bins[0] as BinIndex;
        let ny = if self.dimension > 1 { self.bins[1] as BinIndex } else { 1 };
        let nz = if self.dimension > 2 { self.bins[2] as BinIndex } else { 1 };
        let mut sum = 0.0;
        for k in 1..=nz {
            for j in 1..=ny {
                for i in 1..=nx {
                    sum += self.bin_content(self.bin(i, j, k));
                }
            }
        }
        sum
    }

    fn bin_of(&self, index: &[BinIndex]) -> usize {
        let at = |d: usize| index.get(d).copied().unwrap_or(0);
        self.bin(at(0), at(1), at(2))
    }

    /// Content at a one-based multi-index.
    pub fn content(&self, index: &[BinIndex]) -> f64 {
        self.bin_content(self.bin_of(index))
    }

    /// Error at a one-based multi-index.
    pub fn error(&self, index: &[BinIndex]) -> f64 {
        self.bin_error(self.bin_of(index))
    }
}

impl ResultHistogram for Hist3 {
    fn rank(&self) -> usize {
        self.dimension
    }

    fn extents(&self) -> Vec<usize> {
        self.bins[..self.dimension].to_vec()
    }

    fn enable_sumw2(&mut self) {
        self.sumw2();
    }

    fn set_entry(&mut self, index: &[BinIndex], value: &BinValue) {
        let bin = self.bin_of(index);
        self.set_bin_content(bin, value.content());
        if let Some(e) = value.error() {
            self.set_bin_error(bin, e);
        }
    }
}

/// Result histogram of arbitrary rank.
#[derive(Debug, Clone, PartialEq)]
pub struct HistN {
    bins: Vec<usize>,
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
}

impl HistN {
    /// Histogram with `bins[d]` regular bins along dimension `d`, plus flow
    /// bins on every dimension.
    pub fn new(bins: &[usize]) -> Self {
        let len = bins.iter().map(|n| n + 2).product();
        Self { bins: bins.to_vec(), contents: vec![0.0; len], sumw2: None }
    }

    /// Histogram matching the dimensions of a fill layout.
    pub fn for_layout(layout: &FillLayout) -> Self {
        Self::new(&layout.dims())
    }

    /// Regular bins per dimension.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Global bin of a one-based multi-index, first dimension fastest.
    ///
    /// `None` if the rank differs or any index is outside `0..=n+1`.
    pub fn bin(&self, index: &[BinIndex]) -> Option<usize> {
        if index.len() != self.bins.len() {
            return None;
        }
        let mut bin = 0;
        let mut stride = 1;
        for (i, n) in index.iter().zip(&self.bins) {
            if *i < 0 || *i as usize > n + 1 {
                return None;
            }
            bin += *i as usize * stride;
            stride *= n + 2;
        }
        Some(bin)
    }

    /// Content at a one-based multi-index.
    pub fn content(&self, index: &[BinIndex]) -> f64 {
        self.bin(index).map_or(0.0, |b| self.contents[b])
    }

    /// Squared error at a one-based multi-index.
    pub fn error2(&self, index: &[BinIndex]) -> f64 {
        let Some(b) = self.bin(index) else { return 0.0 };
        match &self.sumw2 {
            Some(w2) => w2[b],
            None => self.contents[b].abs(),
        }
    }

    /// Sets the content of a global bin.
    pub fn set_bin_content(&mut self, bin: usize, content: f64) {
        if let Some(c) = self.contents.get_mut(bin) {
            *c = content;
        }
    }

    /// Sets the squared error of a global bin.
    pub fn set_bin_error2(&mut self, bin: usize, error2: f64) {
        self.enable_sumw2();
        if let Some(w2) = self.sumw2.as_mut().and_then(|w| w.get_mut(bin)) {
            *w2 = error2;
        }
    }

    /// Returns `true` in sum-of-squares mode.
    pub fn has_sumw2(&self) -> bool {
        self.sumw2.is_some()
    }
}

impl ResultHistogram for HistN {
    fn rank(&self) -> usize {
        self.bins.len()
    }

    fn extents(&self) -> Vec<usize> {
        self.bins.clone()
    }

    fn enable_sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.contents.iter().map(|c| c.abs()).collect());
        }
    }

    fn set_entry(&mut self, index: &[BinIndex], value: &BinValue) {
        let Some(bin) = self.bin(index) else { return };
        self.set_bin_content(bin, value.content());
        if let Some(v) = value.variance() {
            self.set_bin_error2(bin, v);
        }
    }
}

/// The fill histogram viewed as a result.
///
/// Used when the caller wants the internally indexed histogram itself; the
/// helper fills it directly and finalize transfers nothing.
pub struct FillView<S: Storage> {
    fill: Arc<FillHistogram<S>>,
}

impl<S: Storage> FillView<S> {
    /// Wraps a fill histogram.
    pub fn new(fill: FillHistogram<S>) -> Self {
        Self { fill: Arc::new(fill) }
    }

    /// Shared handle on the wrapped histogram.
    pub fn histogram(&self) -> &Arc<FillHistogram<S>> {
        &self.fill
    }

    /// Leaf value at a one-based multi-index (scalar leaves only).
    pub fn value(&self, index: &[BinIndex]) -> Option<BinValue> {
        let internal: Vec<BinIndex> = index.iter().copied().map(to_internal).collect();
        self.fill.value(&internal, 0)
    }
}

impl<S: Storage> ResultHistogram for FillView<S> {
    fn rank(&self) -> usize {
        self.fill.layout().total_rank()
    }

    fn extents(&self) -> Vec<usize> {
        self.fill.layout().dims()
    }

    fn enable_sumw2(&mut self) {}

    fn set_entry(&mut self, _index: &[BinIndex], _value: &BinValue) {}

    fn aliases_fill(&self) -> bool {
        true
    }

    fn shared_fill<T: Storage>(&self) -> Option<Arc<FillHistogram<T>>> {
        (&self.fill as &dyn Any).downcast_ref::<Arc<FillHistogram<T>>>().cloned()
    }
}

impl<S: Storage> std::fmt::Debug for FillView<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FillView").field("fill", &self.fill).finish()
    }
}
