use std::sync::{Arc, RwLock};

use histfill::engine::accumulator::{BinValue, Count, WeightedSum};
use histfill::engine::action::Action;
use histfill::engine::error::FillError;
use histfill::engine::helper::{FillHelper, FillOwnership, HelperState};
use histfill::engine::histogram::FillHistogram;
use histfill::engine::result::{FillView, Hist3, HistN};
use histfill::engine::storage::{AtomicCountStorage, AtomicWeightStorage, CountStorage, WeightStorage};
use histfill::engine::transfer::bin_entries;
use histfill::engine::types::{to_external, to_internal};

mod common;
use common::*;

#[test]
fn end_to_end_weighted_fill_and_transfer() {
    init_logging();
    let fill: FillHistogram<AtomicWeightStorage> = hist_1d();
    let result = Hist3::for_layout(fill.layout()).unwrap();
    let mut helper = FillHelper::new(result, fill).unwrap();

    helper.exec(0, (0.5,)).unwrap();
    helper.exec(0, (1.5, 1.5)).unwrap();

    {
        let fill = helper.fill_object().unwrap();
        assert_eq!(
            fill.value(&[0], 0),
            Some(BinValue::WeightedSum(WeightedSum { value: 1.0, sum_of_weight_squares: 1.0 }))
        );
        assert_eq!(
            fill.value(&[1], 0),
            Some(BinValue::WeightedSum(WeightedSum { value: 1.5, sum_of_weight_squares: 2.25 }))
        );
    }

    // three bins plus two flow bins
    assert_eq!(helper.finalize().unwrap(), 5);

    let result = helper.result();
    let h = result.read().unwrap();
    assert!(h.has_sumw2());
    assert_eq!(h.content(&[1]), 1.0);
    assert_eq!(h.error(&[1]), 1.0);
    assert_eq!(h.content(&[2]), 1.5);
    assert_eq!(h.error(&[2]), 1.5);
    assert_eq!(h.content(&[0]), 0.0);
    assert_eq!(h.content(&[4]), 0.0);
    assert_eq!(h.integral(), 2.5);
}

#[test]
fn end_to_end_count_fill_ignores_weights() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let result = Hist3::for_layout(fill.layout()).unwrap();
    let mut helper = FillHelper::new(result, fill).unwrap();

    helper.exec(0, (0.5,)).unwrap();
    helper.exec(0, (1.5, 1.5)).unwrap();
    helper.finalize().unwrap();

    let result = helper.result();
    let h = result.read().unwrap();
    assert!(!h.has_sumw2());
    assert_eq!(h.content(&[1]), 1.0);
    assert_eq!(h.content(&[2]), 1.0);
}

#[test]
fn internal_indices_shift_by_one() {
    assert_eq!(to_external(-1), 0);
    assert_eq!(to_external(0), 1);
    assert_eq!(to_internal(4), 3);

    let fill: FillHistogram<CountStorage> = hist_2d();
    fill.fill_args((0.5, 1.5)).unwrap();
    fill.fill_args((-3.0, 0.5)).unwrap();

    let entries = bin_entries(&fill);
    assert_eq!(entries.len(), 16);

    let find = |index: &[i32]| entries.iter().find(|e| e.index.as_slice() == index).map(|e| e.value);
    assert_eq!(find(&[1, 2]), Some(BinValue::Count(Count(1))));
    assert_eq!(find(&[0, 1]), Some(BinValue::Count(Count(1))));
    assert_eq!(find(&[1, 1]), Some(BinValue::Count(Count(0))));

    // first dimension fastest
    assert_eq!(entries[0].index.as_slice(), &[0, 0]);
    assert_eq!(entries[1].index.as_slice(), &[1, 0]);
    assert_eq!(entries[4].index.as_slice(), &[0, 1]);
}

#[test]
fn two_dimensional_result_receives_shifted_bins() {
    let fill: FillHistogram<WeightStorage> = hist_2d();
    let result = Hist3::for_layout(fill.layout()).unwrap();
    let mut helper = FillHelper::new(result, fill).unwrap();

    helper.exec(0, (0.5, 1.5, 2.0)).unwrap();
    helper.exec(0, (5.0, -1.0, 3.0)).unwrap();
    helper.finalize().unwrap();

    let result = helper.result();
    let h = result.read().unwrap();
    assert_eq!(h.dimension(), 2);
    assert_eq!(h.content(&[1, 2]), 2.0);
    assert_eq!(h.error(&[1, 2]), 2.0);
    assert_eq!(h.content(&[3, 0]), 3.0);
    assert_eq!(h.bin(1, 2, 0), 1 + 4 * 2);
    // clamped onto the overflow bin
    assert_eq!(h.bin(9, 2, 0), 3 + 4 * 2);
}

#[test]
fn tensor_leaves_extend_the_external_index() {
    let fill: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let result = HistN::for_layout(fill.layout());
    assert_eq!(result.bins(), &[2, 2, 2, 2]);
    let mut helper = FillHelper::new(result, fill).unwrap();

    let t = tensor_1234();
    helper.exec(0, (0.5, 0.5, &t)).unwrap();

    let entries = bin_entries(helper.fill_object().unwrap());
    assert_eq!(entries.len(), 16 * 4);
    let leaf = entries.iter().find(|e| e.index.as_slice() == [1, 1, 2, 1]).unwrap();
    assert_eq!(leaf.value, BinValue::WeightedSum(WeightedSum { value: 3.0, sum_of_weight_squares: 9.0 }));

    assert_eq!(helper.finalize().unwrap(), 64);

    let result = helper.result();
    let h = result.read().unwrap();
    assert_eq!(h.content(&[1, 1, 2, 1]), 3.0);
    assert_eq!(h.error2(&[1, 1, 2, 1]), 9.0);
    assert_eq!(h.content(&[1, 1, 1, 2]), 2.0);
    assert_eq!(h.content(&[1, 1, 2, 2]), 4.0);
    assert_eq!(h.content(&[2, 1, 2, 1]), 0.0);
}

#[test]
fn result_rank_is_checked_at_construction() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let err = FillHelper::new(Hist3::new_2d(3, 3), fill).unwrap_err();
    assert_eq!(err, FillError::RankMismatch { expected: 1, found: 2 });

    let tensor: FillHistogram<AtomicWeightStorage> = tensor_hist();
    assert!(Hist3::for_layout(tensor.layout()).is_err());
    assert!(FillHelper::new(HistN::new(&[2, 2]), tensor).is_err());
}

#[test]
fn result_bin_counts_are_checked_at_construction() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let err = FillHelper::new(Hist3::new_1d(1), fill).unwrap_err();
    assert_eq!(err, FillError::ExtentMismatch { expected: vec![3], found: vec![1] });

    let tensor: FillHistogram<AtomicWeightStorage> = tensor_hist();
    let err = FillHelper::new(HistN::new(&[2, 2, 3, 2]), tensor).unwrap_err();
    assert_eq!(err, FillError::ExtentMismatch { expected: vec![2, 2, 2, 2], found: vec![2, 2, 3, 2] });

    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let nominal = FillHelper::new(Hist3::new_1d(3), fill).unwrap();
    let narrow = Arc::new(RwLock::new(Hist3::new_1d(2)));
    assert!(matches!(nominal.make_new(narrow, "x"), Err(FillError::ExtentMismatch { .. })));
}

#[test]
fn finalize_runs_exactly_once() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let mut helper = FillHelper::new(Hist3::new_1d(3), fill).unwrap();
    helper.exec(0, (0.5,)).unwrap();

    assert_eq!(helper.state(), HelperState::Constructed);
    helper.finalize().unwrap();
    assert!(helper.is_finalized());

    assert_eq!(helper.finalize(), Err(FillError::AlreadyFinalized));
    assert_eq!(helper.exec(0, (0.5,)), Err(FillError::Finalized));
    assert!(helper.fill_object().is_err());

    // the result stays readable after finalize
    assert_eq!(helper.result().read().unwrap().content(&[1]), 1.0);
}

#[test]
fn aliased_helper_skips_the_transfer() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let mut helper = FillHelper::aliased(fill).unwrap();
    assert_eq!(helper.ownership(), FillOwnership::SharedWithResult);

    helper.exec(0, (vec![0.5, 0.5, 2.5],)).unwrap();
    assert_eq!(helper.finalize().unwrap(), 0);

    let result: Arc<RwLock<FillView<AtomicCountStorage>>> = helper.result();
    let view = result.read().unwrap();
    assert_eq!(view.value(&[1]), Some(BinValue::Count(Count(2))));
    assert_eq!(view.value(&[3]), Some(BinValue::Count(Count(1))));
    assert_eq!(Arc::strong_count(view.histogram()), 1);
}

#[test]
fn make_new_on_an_aliased_result_fills_it_directly() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let mut nominal = FillHelper::aliased(fill).unwrap();

    let mut varied = nominal.make_new(nominal.result(), "shifted").unwrap();
    assert_eq!(varied.ownership(), FillOwnership::SharedWithResult);
    assert!(Arc::ptr_eq(varied.fill_object().unwrap(), nominal.fill_object().unwrap()));

    for _ in 0..5 {
        varied.exec(0, (1.5,)).unwrap();
    }
    assert_eq!(varied.finalize().unwrap(), 0);
    nominal.finalize().unwrap();

    let result = varied.result();
    let view = result.read().unwrap();
    assert_eq!(view.value(&[2]), Some(BinValue::Count(Count(5))));
    assert_eq!(Arc::strong_count(view.histogram()), 1);
}

#[test]
fn make_new_builds_an_independent_helper() {
    let fill: FillHistogram<AtomicWeightStorage> = hist_1d();
    let mut nominal = FillHelper::new(Hist3::new_1d(3), fill).unwrap();
    assert_eq!(nominal.name(), "FillHist");
    assert_eq!(nominal.variation(), "nominal");

    let handle = Arc::new(RwLock::new(Hist3::new_1d(3)));
    let mut varied = nominal.make_new(Arc::clone(&handle), "scaleUp").unwrap();
    assert_eq!(varied.variation(), "scaleUp");
    assert_eq!(varied.ownership(), FillOwnership::Owned);
    assert_eq!(varied.layout(), nominal.layout());

    nominal.exec(0, (0.5, 2.0)).unwrap();
    varied.exec(0, (0.5, 4.0)).unwrap();
    nominal.finalize().unwrap();
    varied.finalize().unwrap();

    assert_eq!(nominal.result().read().unwrap().content(&[1]), 2.0);
    assert_eq!(handle.read().unwrap().content(&[1]), 4.0);
    assert!(Arc::ptr_eq(&varied.result(), &handle));

    let wrong = Arc::new(RwLock::new(Hist3::new_2d(3, 3)));
    assert!(matches!(nominal.make_new(wrong, "x"), Err(FillError::RankMismatch { .. })));
}

#[test]
fn action_surface_drives_the_helper() {
    fn drive<A: Action>(action: &mut A) -> usize {
        action.initialize();
        action.exec(0, (1.5,)).unwrap();
        action.finalize().unwrap()
    }

    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let mut helper = FillHelper::new(Hist3::new_1d(3), fill).unwrap();
    assert_eq!(drive(&mut helper), 5);
    assert_eq!(Action::name(&helper), "FillHist");
}

#[test]
fn poisoned_result_is_reported() {
    let fill: FillHistogram<AtomicCountStorage> = hist_1d();
    let mut helper = FillHelper::new(Hist3::new_1d(3), fill).unwrap();

    let handle = helper.result();
    let _ = std::thread::spawn(move || {
        let _guard = handle.write().unwrap();
        panic!("poison the result lock");
    })
    .join();

    assert_eq!(helper.finalize(), Err(FillError::ResultPoisoned));
}
