#![allow(dead_code)]

use std::sync::Once;

use histfill::engine::axis::Axis;
use histfill::engine::histogram::FillHistogram;
use histfill::engine::storage::Storage;
use histfill::engine::tensor::{Shape, WeightTensor};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Three unit bins over `[0, 3)` with both flow bins.
pub fn three_bins() -> Axis {
    Axis::regular(3, 0.0, 3.0).unwrap()
}

/// Two unit bins over `[0, 2)` with both flow bins.
pub fn two_bins() -> Axis {
    Axis::regular(2, 0.0, 2.0).unwrap()
}

pub fn hist_1d<S: Storage>() -> FillHistogram<S> {
    FillHistogram::new(vec![three_bins()]).unwrap()
}

pub fn hist_2d<S: Storage>() -> FillHistogram<S> {
    FillHistogram::new(vec![two_bins(), two_bins()]).unwrap()
}

/// Rank-2 histogram with `(2, 2)` tensor leaves.
pub fn tensor_hist<S: Storage>() -> FillHistogram<S> {
    FillHistogram::with_tensor(vec![two_bins(), two_bins()], shape_2x2()).unwrap()
}

pub fn shape_2x2() -> Shape {
    Shape::new(&[2, 2]).unwrap()
}

/// `[[1, 2], [3, 4]]`
pub fn tensor_1234() -> WeightTensor {
    WeightTensor::from_vec(shape_2x2(), vec![1.0, 2.0, 3.0, 4.0]).unwrap()
}
