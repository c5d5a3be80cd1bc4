//! Fixed-shape tensors for tensor-valued weights and accumulators.
//!
//! A tensor-valued accumulator stores a small grid of leaves per bin (e.g. one
//! leaf per systematic variation). The matching weight is a [`WeightTensor`] of
//! the same [`Shape`]; one fill updates every leaf at once.
//!
//! Data is row-major: the last index varies fastest. [`Shape::indices`] walks
//! the leaves in exactly that order, so the position of a leaf in the iteration
//! equals its flat offset.

use std::ops::Mul;

use smallvec::SmallVec;

use crate::engine::error::AxisError;
use crate::engine::types::{BinIndex, MAX_RANK};


/// Extents of a fixed-size tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; MAX_RANK]>,
}

impl Shape {
    /// Builds a shape. Every extent must be non-zero.
    pub fn new(dims: &[usize]) -> Result<Self, AxisError> {
        if dims.is_empty() || dims.len() > MAX_RANK || dims.contains(&0) {
            return Err(AxisError::InvalidShape);
        }
        dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d)).ok_or(AxisError::StorageOverflow)?;
        Ok(Self { dims: SmallVec::from_slice(dims) })
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Extents.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of leaves.
    #[inline]
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Iterates all zero-based leaf indices in row-major order.
    pub fn indices(&self) -> LeafIndices<'_> {
        LeafIndices { shape: self, next: Some(SmallVec::from_elem(0, self.rank())) }
    }
}

/// Row-major iterator over the leaf indices of a [`Shape`].
pub struct LeafIndices<'a> {
    shape: &'a Shape,
    next: Option<SmallVec<[BinIndex; MAX_RANK]>>,
}

impl Iterator for LeafIndices<'_> {
    type Item = SmallVec<[BinIndex; MAX_RANK]>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        for d in (0..succ.len()).rev() {
            succ[d] += 1;
            if (succ[d] as usize) < self.shape.dims[d] {
                self.next = Some(succ);
                break;
            }
            succ[d] = 0;
        }
        Some(current)
    }
}

/// A fixed-shape block of weights.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTensor {
    shape: Shape,
    data: Vec<f64>,
}

impl WeightTensor {
    /// Builds a tensor from row-major data. `data.len()` must equal `shape.numel()`.
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self, AxisError> {
        if data.len() != shape.numel() {
            return Err(AxisError::InvalidShape);
        }
        Ok(Self { shape, data })
    }

    /// Tensor with every leaf set to `value`.
    pub fn filled(shape: Shape, value: f64) -> Self {
        let data = vec![value; shape.numel()];
        Self { shape, data }
    }

    /// Shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Row-major leaf values.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Leaf at a zero-based multi-index.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.rank() {
            return None;
        }
        let mut flat = 0;
        for (i, d) in index.iter().zip(self.shape.dims()) {
            if i >= d {
                return None;
            }
            flat = flat * d + i;
        }
        self.data.get(flat).copied()
    }

    /// Element-wise scaling.
    pub fn scaled(&self, factor: f64) -> Self {
        Self { shape: self.shape.clone(), data: self.data.iter().map(|v| v * factor).collect() }
    }
}

// Scalar-by-tensor products only; there is no tensor-by-tensor `Mul`.

impl Mul<f64> for WeightTensor {
    type Output = WeightTensor;

    fn mul(mut self, rhs: f64) -> WeightTensor {
        self.data.iter_mut().for_each(|v| *v *= rhs);
        self
    }
}

impl Mul<f64> for &WeightTensor {
    type Output = WeightTensor;

    fn mul(self, rhs: f64) -> WeightTensor {
        self.scaled(rhs)
    }
}

impl Mul<WeightTensor> for f64 {
    type Output = WeightTensor;

    fn mul(self, rhs: WeightTensor) -> WeightTensor {
        rhs * self
    }
}

impl Mul<&WeightTensor> for f64 {
    type Output = WeightTensor;

    fn mul(self, rhs: &WeightTensor) -> WeightTensor {
        rhs.scaled(self)
    }
}
