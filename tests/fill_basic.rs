use histfill::engine::accumulator::{BinValue, Count, WeightedSum};
use histfill::engine::args::{broadcast, Arg, EventLayout, Sequence, Value};
use histfill::engine::axis::{Axis, AxisOptions, MAX_BINS};
use histfill::engine::error::{AxisError, FillError, InvalidInputError};
use histfill::engine::histogram::FillHistogram;
use histfill::engine::storage::{AtomicCountStorage, AtomicWeightStorage, CountStorage, WeightStorage};
use histfill::engine::tensor::{Shape, WeightTensor};

mod common;
use common::*;

fn count(n: u64) -> Option<BinValue> {
    Some(BinValue::Count(Count(n)))
}

fn weighted(value: f64, sum_of_weight_squares: f64) -> Option<BinValue> {
    Some(BinValue::WeightedSum(WeightedSum { value, sum_of_weight_squares }))
}

#[test]
fn scalar_event_updates_exactly_one_bin() {
    init_logging();
    let h: FillHistogram<AtomicCountStorage> = hist_2d();

    h.fill_args((0.5, 1.5)).unwrap();

    assert_eq!(h.value(&[0, 1], 0), count(1));
    assert_eq!(h.sum(), 1.0);
}

#[test]
fn sequence_is_broadcast_with_reused_scalars() {
    let h: FillHistogram<AtomicCountStorage> = hist_2d();

    h.fill_args((vec![-0.5, 0.5, 1.5, 2.5], 0.5)).unwrap();

    assert_eq!(h.value(&[-1, 0], 0), count(1));
    assert_eq!(h.value(&[0, 0], 0), count(1));
    assert_eq!(h.value(&[1, 0], 0), count(1));
    assert_eq!(h.value(&[2, 0], 0), count(1));
    assert_eq!(h.sum(), 4.0);
}

#[test]
fn sequence_weights_advance_in_lock_step() {
    let h: FillHistogram<AtomicWeightStorage> = hist_1d();

    h.fill_args((&[0.5, 0.5, 2.5][..], &[2.0, 3.0, 0.5][..])).unwrap();

    assert_eq!(h.value(&[0], 0), weighted(5.0, 13.0));
    assert_eq!(h.value(&[2], 0), weighted(0.5, 0.25));
}

#[test]
fn mismatched_lengths_reject_the_whole_event() {
    let h: FillHistogram<AtomicWeightStorage> = hist_1d();

    let err = h.fill_args((vec![0.5, 1.5], vec![1.0])).unwrap_err();

    assert_eq!(
        err,
        FillError::InvalidInput(InvalidInputError::LengthMismatch { argument: 1, expected: 2, found: 1 })
    );
    assert_eq!(h.sum(), 0.0);
}

#[test]
fn mismatch_is_detected_before_the_first_element() {
    let h: FillHistogram<AtomicCountStorage> = hist_2d();

    // The first sequence sets the expected length, even if it is the longer one.
    let err = h.fill_args(([0.5, 0.5, 0.5], 0.5, [1.0, 1.0])).unwrap_err();

    assert!(matches!(
        err,
        FillError::InvalidInput(InvalidInputError::LengthMismatch { argument: 2, expected: 3, found: 2 })
    ));
    assert_eq!(h.sum(), 0.0);
}

#[test]
fn empty_sequence_fills_nothing() {
    let h: FillHistogram<AtomicCountStorage> = hist_1d();

    h.fill_args((Vec::<f64>::new(),)).unwrap();

    assert_eq!(h.sum(), 0.0);
}

#[test]
fn integer_and_bool_arguments_are_accepted() {
    let h: FillHistogram<CountStorage> =
        FillHistogram::new(vec![Axis::integer(0, 4).unwrap(), Axis::integer(0, 2).unwrap()]).unwrap();

    h.fill_args((vec![0u8, 3, 3], true)).unwrap();
    h.fill_args((2i64, false)).unwrap();

    assert_eq!(h.value(&[3, 1], 0), count(2));
    assert_eq!(h.value(&[0, 1], 0), count(1));
    assert_eq!(h.value(&[2, 0], 0), count(1));
}

#[test]
fn missing_coordinates_are_rejected() {
    let h: FillHistogram<AtomicCountStorage> = hist_2d();

    let err = h.fill_args((0.5,)).unwrap_err();

    assert_eq!(err, FillError::InvalidInput(InvalidInputError::MissingCoordinates { rank: 2, given: 1 }));
}

#[test]
fn tensor_coordinate_is_rejected() {
    let h: FillHistogram<AtomicCountStorage> = hist_2d();
    let t = tensor_1234();

    let err = h.fill_args((&t, 0.5)).unwrap_err();

    assert_eq!(err, FillError::InvalidInput(InvalidInputError::NonScalarCoordinate { argument: 0 }));
}

#[test]
fn flow_values_land_in_flow_bins() {
    let h: FillHistogram<AtomicCountStorage> = hist_1d();

    h.fill_args((-1.0,)).unwrap();
    h.fill_args((3.0,)).unwrap();
    h.fill_args((f64::NAN,)).unwrap();

    assert_eq!(h.value(&[-1], 0), count(1));
    assert_eq!(h.value(&[3], 0), count(2));
}

#[test]
fn values_outside_an_axis_without_flow_bins_are_dropped() {
    let axis = Axis::regular_with(3, 0.0, 3.0, AxisOptions::NONE).unwrap();
    let h: FillHistogram<AtomicCountStorage> = FillHistogram::new(vec![axis]).unwrap();

    h.fill_args((vec![-1.0, 1.5, 7.0],)).unwrap();

    assert_eq!(h.sum(), 1.0);
    assert_eq!(h.value(&[1], 0), count(1));
    assert_eq!(h.value(&[-1], 0), None);
}

#[test]
fn variable_axis_locates_bins_by_edges() {
    let axis = Axis::variable(vec![0.0, 1.0, 4.0, 10.0]).unwrap();
    let h: FillHistogram<WeightStorage> = FillHistogram::new(vec![axis]).unwrap();

    h.fill_args((vec![0.0, 3.9, 4.0, 10.0],)).unwrap();

    assert_eq!(h.value(&[0], 0), weighted(1.0, 1.0));
    assert_eq!(h.value(&[1], 0), weighted(1.0, 1.0));
    assert_eq!(h.value(&[2], 0), weighted(1.0, 1.0));
    assert_eq!(h.value(&[3], 0), weighted(1.0, 1.0));
}

#[test]
fn invalid_axes_are_rejected() {
    assert!(Axis::regular(0, 0.0, 1.0).is_err());
    assert!(Axis::regular(3, 1.0, 1.0).is_err());
    assert!(Axis::variable(vec![0.0, 2.0, 1.0]).is_err());
    assert!(Axis::integer(5, 5).is_err());
    assert!(FillHistogram::<AtomicCountStorage>::new(Vec::new()).is_err());
}

#[test]
fn axes_beyond_the_bin_index_range_are_rejected() {
    assert_eq!(
        Axis::integer(i64::MIN, i64::MAX),
        Err(AxisError::TooManyBins { bins: u64::MAX })
    );
    assert_eq!(
        Axis::regular_with(1 << 32, 0.0, 1.0, AxisOptions::NONE),
        Err(AxisError::TooManyBins { bins: 1 << 32 })
    );

    let widest = Axis::regular_with(MAX_BINS, 0.0, 1.0, AxisOptions::NONE).unwrap();
    assert_eq!(widest.index(0.5), Some((MAX_BINS / 2) as i32));

    let far_integer = Axis::integer(i64::MIN, i64::MIN + 4).unwrap();
    assert_eq!(far_integer.size(), 4);
    assert_eq!(far_integer.extent(), 6);
}

#[test]
fn storage_size_overflow_is_rejected() {
    let axis = Axis::regular_with(1 << 30, 0.0, 1.0, AxisOptions::NONE).unwrap();
    let axes = vec![axis; 4];

    let err = FillHistogram::<AtomicCountStorage>::new(axes).unwrap_err();

    assert_eq!(err, AxisError::StorageOverflow);
    assert_eq!(Shape::new(&[usize::MAX, 2]), Err(AxisError::StorageOverflow));
}

#[test]
fn count_storage_ignores_weight_values() {
    let h: FillHistogram<AtomicCountStorage> = hist_1d();

    h.fill_args((1.5, 7.0)).unwrap();
    h.fill_args((1.5, 0.25, 2.0)).unwrap();

    assert_eq!(h.value(&[1], 0), count(2));
}

#[test]
fn several_weights_are_multiplied() {
    let h: FillHistogram<AtomicWeightStorage> = hist_1d();

    h.fill_args((1.5, 2.0, 3.0, 0.5)).unwrap();

    assert_eq!(h.value(&[1], 0), weighted(3.0, 9.0));
}

#[test]
fn tensor_weight_updates_each_leaf() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let t = tensor_1234();

    h.fill_args((0.5, 0.5, &t)).unwrap();

    assert_eq!(h.value(&[0, 0], 0), weighted(1.0, 1.0));
    assert_eq!(h.value(&[0, 0], 1), weighted(2.0, 4.0));
    assert_eq!(h.value(&[0, 0], 2), weighted(3.0, 9.0));
    assert_eq!(h.value(&[0, 0], 3), weighted(4.0, 16.0));
    assert_eq!(h.value(&[0, 0], 4), None);
}

#[test]
fn scalar_weight_is_applied_to_every_tensor_leaf() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();

    h.fill_args((1.5, 0.5, 2.0)).unwrap();

    for leaf in 0..4 {
        assert_eq!(h.value(&[1, 0], leaf), weighted(2.0, 4.0));
    }
}

#[test]
fn scalar_times_tensor_scales_each_leaf() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let t = tensor_1234();

    h.fill_args((0.5, 0.5, 2.0, &t)).unwrap();

    assert_eq!(h.value(&[0, 0], 0), weighted(2.0, 4.0));
    assert_eq!(h.value(&[0, 0], 3), weighted(8.0, 64.0));
}

#[test]
fn tensor_sequence_is_broadcast() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let ts = vec![tensor_1234(), WeightTensor::filled(shape_2x2(), 0.5)];

    h.fill_args(([0.5, 1.5], 0.5, &ts)).unwrap();

    assert_eq!(h.value(&[0, 0], 1), weighted(2.0, 4.0));
    assert_eq!(h.value(&[1, 0], 1), weighted(0.5, 0.25));
}

#[test]
fn tensor_product_is_rejected() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let t = tensor_1234();

    let err = h.fill_args((0.5, 0.5, &t, &t)).unwrap_err();

    assert_eq!(err, FillError::InvalidInput(InvalidInputError::TensorProduct));
    assert_eq!(h.sum(), 0.0);
}

#[test]
fn tensor_shape_must_match_the_accumulator() {
    let h: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let wrong = WeightTensor::filled(Shape::new(&[3]).unwrap(), 1.0);

    let err = h.fill_args((0.5, 0.5, &wrong)).unwrap_err();

    assert_eq!(
        err,
        FillError::InvalidInput(InvalidInputError::TensorShapeMismatch { expected: vec![2, 2], found: vec![3] })
    );

    let scalar: FillHistogram<AtomicWeightStorage> = hist_2d();
    let err = scalar.fill_args((0.5, 0.5, &tensor_1234())).unwrap_err();
    assert_eq!(
        err,
        FillError::InvalidInput(InvalidInputError::TensorShapeMismatch { expected: vec![], found: vec![2, 2] })
    );
}

#[test]
fn runtime_descriptors_follow_the_same_rules() {
    let h: FillHistogram<AtomicWeightStorage> = hist_1d();
    let xs = [0.5, 1.5];

    h.fill_descriptors(&[Arg::Sequence(Sequence::F64(&xs)), Arg::Scalar(Value::Real(2.0))]).unwrap();
    assert_eq!(h.value(&[0], 0), weighted(2.0, 4.0));
    assert_eq!(h.value(&[1], 0), weighted(2.0, 4.0));

    h.fill_descriptors(&[Arg::Scalar(Value::Real(2.5))]).unwrap();
    assert_eq!(h.value(&[2], 0), weighted(1.0, 1.0));

    let err = h
        .fill_descriptors(&[Arg::Sequence(Sequence::F64(&xs)), Arg::Sequence(Sequence::F64(&xs[..1]))])
        .unwrap_err();
    assert!(matches!(err, FillError::InvalidInput(InvalidInputError::LengthMismatch { .. })));
}

#[test]
fn broadcast_without_a_sequence_is_an_internal_error() {
    let args = [Arg::Scalar(Value::Real(0.5)), Arg::Scalar(Value::Real(2.0))];
    let layout = EventLayout { rank: 1, tensor_shape: None };
    let mut filled = 0;

    let err = broadcast(&args, layout, |_, _| filled += 1).unwrap_err();

    assert!(matches!(err, FillError::InternalInvariantViolation(_)));
    assert_eq!(filled, 0);
}

#[test]
fn too_many_arguments_are_rejected() {
    let h: FillHistogram<AtomicWeightStorage> = hist_1d();
    let args = [Arg::Scalar(Value::Real(1.0)); 9];

    let err = h.fill_descriptors(&args).unwrap_err();

    assert_eq!(err, FillError::InvalidInput(InvalidInputError::TooManyArguments { given: 9 }));
}
