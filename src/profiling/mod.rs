//! Span timing profiler.
//!
//! This module provides a **feature-gated, zero-overhead (when disabled)**
//! profiling API for the fill engine. When enabled, every [`span`] records how
//! long its guard lived; durations are aggregated per span name and can be
//! read back with [`report`].
//!
//! ## Feature flag
//!
//! ```bash
//! cargo test --features profiling
//! ```
//!
//! When the feature is disabled, all profiling calls compile to no-ops and
//! [`report`] is always empty.
//!
//! ## Instrumented spans
//!
//! - `run_events::chunk` – one chunk of events on one worker
//! - `run_sequential` – a single-threaded run
//! - `FillHelper::finalize` – bin transfer into the result histogram

/// Feature-gated span recorder.
pub mod profiler;

pub use profiler::{init, report, reset, shutdown, span, SpanGuard, SpanName, SpanStats};
