#![allow(dead_code)]

use histfill::engine::axis::Axis;
use histfill::engine::helper::FillHelper;
use histfill::engine::histogram::FillHistogram;
use histfill::engine::result::Hist3;
use histfill::engine::storage::Storage;
use histfill::engine::tensor::{Shape, WeightTensor};

pub const EVENTS_SMALL: usize = 100_000;
pub const EVENTS_MED: usize = 1_000_000;

pub const BINS: usize = 100;

pub fn axes_2d() -> Vec<Axis> {
    vec![
        Axis::regular(BINS, 0.0, 1.0).unwrap(),
        Axis::regular(BINS, 0.0, 1.0).unwrap(),
    ]
}

pub fn helper_2d<S: Storage>() -> FillHelper<Hist3, S> {
    let fill: FillHistogram<S> = FillHistogram::new(axes_2d()).unwrap();
    let result = Hist3::for_layout(fill.layout()).unwrap();
    FillHelper::new(result, fill).unwrap()
}

pub fn tensor_histogram<S: Storage>(leaves: usize) -> FillHistogram<S> {
    FillHistogram::with_tensor(axes_2d(), Shape::new(&[leaves]).unwrap()).unwrap()
}

pub fn tensor_weight(leaves: usize) -> WeightTensor {
    let shape = Shape::new(&[leaves]).unwrap();
    WeightTensor::from_vec(shape, (0..leaves).map(|i| 1.0 + i as f64 * 0.01).collect()).unwrap()
}

/// Deterministic pseudo-random coordinates in `[0, 1)`.
pub fn events(n: usize) -> Vec<(f64, f64, f64)> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..n).map(|_| (next(), next(), 0.5 + next())).collect()
}
