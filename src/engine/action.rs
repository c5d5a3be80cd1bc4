//! Action abstraction consumed by event drivers.
//!
//! An **action** is a stateful computation attached to an event loop. The
//! driver owns the loop and the worker threads; the action only reacts to the
//! calls below, in this order:
//!
//! ```text
//! initialize ─► init_task (once per worker) ─► exec (many, concurrent) ─► finalize
//! ```
//!
//! ## Thread safety
//!
//! [`Action::exec`] takes `&self` and may be called from every worker at once.
//! [`Action::finalize`] takes `&mut self`: once a driver can call it, no
//! `exec` is in flight.
//!
//! ## Intended usage
//!
//! [`FillHelper`](crate::engine::helper::FillHelper) is the action provided by
//! this crate; [`run_events`](crate::engine::scheduler::run_events) is a
//! rayon-backed driver generic over any action.

use crate::engine::args::{Arg, FillArgs};
use crate::engine::error::FillResult;
use crate::engine::types::SlotId;


/// Identity of a worker thread inside a driver's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    /// Zero-based worker number.
    pub worker: usize,

    /// Total number of workers.
    pub workers: usize,
}

/// A computation driven over a stream of events.
pub trait Action {
    /// Handle the caller reads after the run.
    type Result;

    /// Called once before any worker starts.
    fn initialize(&self) {}

    /// Called once per worker before its first event.
    fn init_task(&self, _ctx: &WorkerContext, _slot: SlotId) {}

    /// Processes one event.
    fn exec<A: FillArgs>(&self, slot: SlotId, args: A) -> FillResult<()>;

    /// Processes one event given as runtime descriptors.
    fn exec_args(&self, slot: SlotId, args: &[Arg<'_>]) -> FillResult<()>;

    /// Called once after every worker is done.
    fn finalize(&mut self) -> FillResult<usize>;

    /// Handle on the result.
    fn result(&self) -> Self::Result;

    /// Fresh action of the same configuration, bound to `result`.
    fn make_new(&self, result: Self::Result, variation: &str) -> FillResult<Self>
    where
        Self: Sized;

    /// Fixed identifier of the action kind.
    fn name(&self) -> &'static str;
}
