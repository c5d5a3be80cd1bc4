//! Event driving and execution.
//!
//! This module stands in for the execution framework that normally owns the
//! event loop. It is responsible for:
//! * building a worker pool sized by [`RunConfig`],
//! * calling the action's lifecycle hooks in order,
//! * feeding events to [`Action::exec`] in parallel using Rayon,
//! * collecting per-event rejections into a [`RunReport`].
//!
//! ## Execution model
//!
//! ```text
//! initialize ─► init_task on every worker ─► par_chunks(events).exec ─► finalize
//! ```
//!
//! Events are split into chunks of [`RunConfig::chunk_size`]; each chunk is
//! processed by one worker. A rejected event is logged, counted and skipped;
//! it never aborts the run. Only pool construction and finalize can fail the
//! run as a whole.
//!
//! ## Configuration
//!
//! [`RunConfig::from_env`] reads `HISTFILL_THREADS` and `HISTFILL_CHUNK`.
//! A thread count of `0` lets Rayon pick one worker per logical CPU.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::engine::action::{Action, WorkerContext};
use crate::engine::args::FillArgs;
use crate::engine::error::{FillError, FillResult};
use crate::engine::threading::{is_implicit_mt_enabled, pool_size};
use crate::engine::types::SlotId;
use crate::profiling;


/// Environment variable holding the worker count.
pub const THREADS_ENV: &str = "HISTFILL_THREADS";

/// Environment variable holding the chunk size.
pub const CHUNK_ENV: &str = "HISTFILL_CHUNK";

const DEFAULT_CHUNK: usize = 1024;

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Worker count; `0` selects one per logical CPU.
    pub threads: usize,

    /// Events handed to a worker at a time.
    pub chunk_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { threads: 0, chunk_size: DEFAULT_CHUNK }
    }
}

impl RunConfig {
    /// Sets the worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the chunk size. Clamped to at least one event.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Defaults overridden by `HISTFILL_THREADS` / `HISTFILL_CHUNK`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threads) = read_env(THREADS_ENV) {
            config = config.with_threads(threads);
        }
        if let Some(chunk) = read_env(CHUNK_ENV) {
            config = config.with_chunk_size(chunk);
        }
        config
    }

    /// Worker count taken from the implicit multi-threading policy: the
    /// policy's pool size when enabled, a single worker otherwise.
    pub fn from_policy() -> Self {
        let threads = if is_implicit_mt_enabled() { pool_size() } else { 1 };
        Self::default().with_threads(threads)
    }
}

fn read_env(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw:?}: not a non-negative integer");
            None
        }
    }
}

/// Outcome of a driven run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Events filled successfully.
    pub processed: usize,

    /// Events rejected by the action.
    pub rejected: usize,

    /// First rejection observed, if any. With several workers "first" is in
    /// completion order, not event order.
    pub first_error: Option<FillError>,

    /// Leaves written by finalize.
    pub written: usize,
}

/// Runs `events` through `action` on a Rayon pool, then finalizes it.
pub fn run_events<H, E>(action: &mut H, events: &[E], config: &RunConfig) -> FillResult<RunReport>
where
    H: Action + Sync,
    E: FillArgs + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| FillError::ThreadPool(e.to_string()))?;

    log::debug!(
        "{}: running {} events on {} workers (chunk {})",
        action.name(),
        events.len(),
        pool.current_num_threads(),
        config.chunk_size
    );

    let rejected = AtomicUsize::new(0);
    let first_error: Mutex<Option<FillError>> = Mutex::new(None);
    {
        let shared: &H = action;
        shared.initialize();

        pool.broadcast(|ctx| {
            let worker = WorkerContext { worker: ctx.index(), workers: ctx.num_threads() };
            shared.init_task(&worker, ctx.index() as SlotId);
        });

        let chunk_size = config.chunk_size.max(1);
        pool.install(|| {
            events.par_chunks(chunk_size).for_each(|chunk| {
                let _span = profiling::span("run_events::chunk");
                let slot = rayon::current_thread_index().unwrap_or(0) as SlotId;
                for event in chunk {
                    if let Err(e) = shared.exec(slot, event) {
                        log::warn!("{}: event rejected: {e}", shared.name());
                        rejected.fetch_add(1, Ordering::Relaxed);
                        first_error
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .get_or_insert(e);
                    }
                }
            });
        });
    }

    let written = action.finalize()?;
    let rejected = rejected.into_inner();
    Ok(RunReport {
        processed: events.len() - rejected,
        rejected,
        first_error: first_error.into_inner().unwrap_or_else(PoisonError::into_inner),
        written,
    })
}

/// Runs `events` through `action` on the calling thread, then finalizes it.
///
/// For actions over single-threaded storage, which cannot be shared with a
/// worker pool.
pub fn run_sequential<H, E>(action: &mut H, events: &[E]) -> FillResult<RunReport>
where
    H: Action,
    E: FillArgs,
{
    action.initialize();
    action.init_task(&WorkerContext { worker: 0, workers: 1 }, 0);

    let mut rejected = 0;
    let mut first_error = None;
    {
        let _span = profiling::span("run_sequential");
        for event in events {
            if let Err(e) = action.exec(0, event) {
                log::warn!("{}: event rejected: {e}", action.name());
                rejected += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    let written = action.finalize()?;
    Ok(RunReport { processed: events.len() - rejected, rejected, first_error, written })
}
