//! Fill helper: the lifecycle around one shared fill histogram.
//!
//! A [`FillHelper`] pairs a result histogram (what the caller keeps) with a
//! fill histogram (what worker threads fill). Its life has three phases:
//!
//! ```text
//! construct ──► exec, exec, … (any thread, &self) ──► finalize (&mut self, once)
//! ```
//!
//! * **Construction** checks the threading capability of the storage against
//!   the implicit multi-threading policy, and the rank and per-dimension bin
//!   counts of the result object.
//!   Both failures are fatal.
//! * **Exec** validates and fills one event. It takes `&self`; the shared fill
//!   histogram is updated atomically, with no per-thread replica to merge.
//! * **Finalize** transfers every bin into the result object (unless the two
//!   are the same object) and releases the helper's handle on the fill
//!   histogram.
//!
//! ## Ownership of the fill histogram
//!
//! [`FillOwnership`] records where the fill histogram came from. It only
//! changes what finalize does; exec is identical in all three cases.

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::engine::action::{Action, WorkerContext};
use crate::engine::args::{Arg, FillArgs};
use crate::engine::error::{ConcurrencyUnsupportedError, FillError, FillResult};
use crate::engine::histogram::{FillHistogram, FillLayout};
use crate::engine::result::{check_layout, FillView, ResultHistogram};
use crate::engine::storage::Storage;
use crate::engine::threading::{is_implicit_mt_enabled, pool_size};
use crate::engine::types::{SlotId, HELPER_NAME, NOMINAL_VARIATION};
use crate::profiling;


/// Shared handle on a result histogram.
pub type ResultHandle<R> = Arc<RwLock<R>>;

/// Provenance of a helper's fill histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOwnership {
    /// Allocated by the helper. Released at finalize.
    Owned,

    /// Handed in by the caller, possibly shared with other helpers. Finalize
    /// transfers and drops this helper's handle only.
    ExternallySupplied,

    /// The result object is the fill histogram. Finalize transfers nothing.
    SharedWithResult,
}

/// Lifecycle state of a helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperState {
    /// Accepting events.
    Constructed,

    /// Fill histogram released; only [`FillHelper::result`] remains useful.
    Finalized,
}

/// Concurrent fill helper over storage `S`, publishing into `R`.
pub struct FillHelper<R: ResultHistogram, S: Storage> {
    result: ResultHandle<R>,
    fill: Option<Arc<FillHistogram<S>>>,
    layout: FillLayout,
    ownership: FillOwnership,
    variation: String,
    state: HelperState,
}

fn check_threading<S: Storage>() -> FillResult<()> {
    if is_implicit_mt_enabled() && !S::HAS_THREADING_SUPPORT {
        return Err(ConcurrencyUnsupportedError { storage: S::name(), threads: pool_size() }.into());
    }
    Ok(())
}

impl<R: ResultHistogram, S: Storage> FillHelper<R, S> {
    fn build(
        result: ResultHandle<R>,
        fill: Arc<FillHistogram<S>>,
        ownership: FillOwnership,
        variation: &str,
    ) -> FillResult<Self> {
        check_threading::<S>()?;
        {
            let guard = result.read().map_err(|_| FillError::ResultPoisoned)?;
            check_layout(&*guard, fill.layout())?;
        }

        log::debug!(
            "{HELPER_NAME}: constructed over {} (rank {}, {:?}, variation {variation})",
            S::name(),
            fill.layout().total_rank(),
            ownership,
        );

        Ok(Self {
            result,
            layout: fill.layout().clone(),
            fill: Some(fill),
            ownership,
            variation: variation.to_owned(),
            state: HelperState::Constructed,
        })
    }

    /// Helper owning `fill`, publishing into a new result handle around `result`.
    pub fn new(result: R, fill: FillHistogram<S>) -> FillResult<Self> {
        Self::build(Arc::new(RwLock::new(result)), Arc::new(fill), FillOwnership::Owned, NOMINAL_VARIATION)
    }

    /// Helper bound to an existing result handle, with a freshly allocated
    /// fill histogram of `layout`.
    pub fn from_result(result: ResultHandle<R>, layout: FillLayout) -> FillResult<Self> {
        let fill = FillHistogram::from_layout(layout);
        Self::build(result, Arc::new(fill), FillOwnership::Owned, NOMINAL_VARIATION)
    }

    /// Helper filling a caller-supplied, possibly shared, fill histogram.
    pub fn with_shared_fill(result: R, fill: Arc<FillHistogram<S>>) -> FillResult<Self> {
        Self::build(
            Arc::new(RwLock::new(result)),
            fill,
            FillOwnership::ExternallySupplied,
            NOMINAL_VARIATION,
        )
    }

    /// Fresh helper of the same layout and storage, bound to `result` and
    /// tagged with `variation`.
    ///
    /// The new helper owns its own zeroed fill histogram; nothing filled into
    /// `self` is visible to it. When `result` is itself a fill histogram (see
    /// [`FillHelper::aliased`]) the new helper fills it directly instead.
    pub fn make_new(&self, result: ResultHandle<R>, variation: &str) -> FillResult<Self> {
        let guard = result.read().map_err(|_| FillError::ResultPoisoned)?;
        let shared = if guard.aliases_fill() {
            let fill = guard
                .shared_fill::<S>()
                .ok_or(FillError::InternalInvariantViolation("aliased result uses a different storage"))?;
            Some(fill)
        } else {
            None
        };
        drop(guard);

        match shared {
            Some(fill) => Self::build(result, fill, FillOwnership::SharedWithResult, variation),
            None => {
                let fill = FillHistogram::from_layout(self.layout.clone());
                Self::build(result, Arc::new(fill), FillOwnership::Owned, variation)
            }
        }
    }

    /// Validates and fills one event.
    ///
    /// `slot` identifies the calling worker; it is not needed for correctness.
    #[inline]
    pub fn exec<A: FillArgs>(&self, _slot: SlotId, args: A) -> FillResult<()> {
        self.fill_object()?.fill_args(args)
    }

    /// Validates and fills one event given as runtime descriptors.
    pub fn exec_args(&self, _slot: SlotId, args: &[Arg<'_>]) -> FillResult<()> {
        self.fill_object()?.fill_descriptors(args)
    }

    /// Transfers the fill histogram into the result and releases it.
    ///
    /// Returns the number of leaves written (`0` when the result is the fill
    /// histogram itself).
    pub fn finalize(&mut self) -> FillResult<usize> {
        if self.state == HelperState::Finalized {
            return Err(FillError::AlreadyFinalized);
        }
        let _span = profiling::span("FillHelper::finalize");

        let fill = self
            .fill
            .take()
            .ok_or(FillError::InternalInvariantViolation("fill histogram missing before finalize"))?;
        self.state = HelperState::Finalized;

        let written = match self.ownership {
            FillOwnership::SharedWithResult => 0,
            FillOwnership::Owned | FillOwnership::ExternallySupplied => {
                let mut result = self.result.write().map_err(|_| FillError::ResultPoisoned)?;
                result.publish(&fill)?
            }
        };
        drop(fill);

        log::info!(
            "{HELPER_NAME}: finalized variation {} ({written} leaves, {:?})",
            self.variation,
            self.ownership
        );
        Ok(written)
    }

    /// Shared handle on the result histogram. Valid in every state.
    pub fn result(&self) -> ResultHandle<R> {
        Arc::clone(&self.result)
    }

    /// The live fill histogram, until finalize.
    pub fn fill_object(&self) -> FillResult<&Arc<FillHistogram<S>>> {
        self.fill.as_ref().ok_or(FillError::Finalized)
    }

    /// Layout of the fill histogram.
    pub fn layout(&self) -> &FillLayout {
        &self.layout
    }

    /// Fixed helper identifier.
    pub fn name(&self) -> &'static str {
        HELPER_NAME
    }

    /// Variation tag.
    pub fn variation(&self) -> &str {
        &self.variation
    }

    /// Provenance of the fill histogram.
    pub fn ownership(&self) -> FillOwnership {
        self.ownership
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HelperState {
        self.state
    }

    /// Returns `true` once finalize has run.
    pub fn is_finalized(&self) -> bool {
        self.state == HelperState::Finalized
    }
}

impl<S: Storage> FillHelper<FillView<S>, S> {
    /// Helper whose result object is `fill` itself.
    pub fn aliased(fill: FillHistogram<S>) -> FillResult<Self> {
        let view = FillView::new(fill);
        let shared = Arc::clone(view.histogram());
        Self::build(
            Arc::new(RwLock::new(view)),
            shared,
            FillOwnership::SharedWithResult,
            NOMINAL_VARIATION,
        )
    }
}

impl<R: ResultHistogram, S: Storage> Action for FillHelper<R, S> {
    type Result = ResultHandle<R>;

    fn initialize(&self) {
        log::trace!("{HELPER_NAME}: initialize");
    }

    fn init_task(&self, ctx: &WorkerContext, slot: SlotId) {
        log::trace!("{HELPER_NAME}: init_task worker {}/{} slot {slot}", ctx.worker, ctx.workers);
    }

    fn exec<A: FillArgs>(&self, slot: SlotId, args: A) -> FillResult<()> {
        FillHelper::exec(self, slot, args)
    }

    fn exec_args(&self, slot: SlotId, args: &[Arg<'_>]) -> FillResult<()> {
        FillHelper::exec_args(self, slot, args)
    }

    fn finalize(&mut self) -> FillResult<usize> {
        FillHelper::finalize(self)
    }

    fn result(&self) -> Self::Result {
        FillHelper::result(self)
    }

    fn make_new(&self, result: Self::Result, variation: &str) -> FillResult<Self> {
        FillHelper::make_new(self, result, variation)
    }

    fn name(&self) -> &'static str {
        HELPER_NAME
    }
}

impl<R: ResultHistogram, S: Storage> fmt::Debug for FillHelper<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillHelper")
            .field("storage", &S::name())
            .field("layout", &self.layout)
            .field("ownership", &self.ownership)
            .field("variation", &self.variation)
            .field("state", &self.state)
            .finish()
    }
}
