//! Span timing for the fill engine.
//!
//! Feature-gated with `--features profiling`.
//!
//! Usage:
//!   histfill::profiling::init();
//!   {
//!     let _g = histfill::profiling::span("FillHelper::finalize");
//!     // finalize...
//!   }
//!   for (name, stats) in histfill::profiling::report() { /* ... */ }
//!   histfill::profiling::shutdown();

use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "profiling")]
mod enabled {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Mutex, OnceLock, PoisonError};
    use std::time::Instant;

    use super::*;


    struct ProfilerState {
        is_on: AtomicBool,
        spans: Mutex<HashMap<String, SpanStats>>,
    }

    static STATE: OnceLock<ProfilerState> = OnceLock::new();

    fn state() -> &'static ProfilerState {
        STATE.get_or_init(|| ProfilerState {
            is_on: AtomicBool::new(false),
            spans: Mutex::new(HashMap::new()),
        })
    }

    /// Starts recording spans.
    pub fn init() {
        state().is_on.store(true, Ordering::Release);
    }

    /// Stops recording spans and logs the aggregate at debug level.
    pub fn shutdown() {
        let st = state();
        st.is_on.store(false, Ordering::Release);
        for (name, stats) in report() {
            log::debug!(
                "span {name}: {} calls, {:?} total, {:?} max",
                stats.count,
                stats.total,
                stats.max
            );
        }
    }

    /// Per-name aggregates, sorted by total time, longest first.
    pub fn report() -> Vec<(String, SpanStats)> {
        let spans = state().spans.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = spans.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        out
    }

    /// Clears all aggregates.
    pub fn reset() {
        state().spans.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Create a profiling span.
    pub fn span(name: impl Into<super::SpanName>) -> SpanGuard {
        if !state().is_on.load(Ordering::Acquire) {
            return SpanGuard { name: None, start: Instant::now() };
        }
        SpanGuard { name: Some(name.into().0), start: Instant::now() }
    }

    /// A RAII guard that records its lifetime under its name on drop.
    pub struct SpanGuard {
        name: Option<Cow<'static, str>>,
        start: Instant,
    }

    impl Drop for SpanGuard {
        fn drop(&mut self) {
            let Some(name) = self.name.take() else { return };
            let elapsed = self.start.elapsed();
            log::trace!("span {name} took {elapsed:?}");

            let mut spans = state().spans.lock().unwrap_or_else(PoisonError::into_inner);
            let stats = spans.entry(name.into_owned()).or_default();
            stats.count += 1;
            stats.total += elapsed;
            stats.max = stats.max.max(elapsed);
        }
    }
}

#[cfg(not(feature = "profiling"))]
mod disabled {
    use super::*;

    /// Start recording (no-op when profiling is disabled).
    #[inline]
    pub fn init() {}

    /// Stop recording (no-op).
    #[inline]
    pub fn shutdown() {}

    /// Aggregates (always empty).
    #[inline]
    pub fn report() -> Vec<(String, SpanStats)> {
        Vec::new()
    }

    /// Clear aggregates (no-op).
    #[inline]
    pub fn reset() {}

    /// Create profiling span (no-op).
    #[inline]
    pub fn span(_name: impl Into<super::SpanName>) -> SpanGuard {
        SpanGuard
    }

    /// No-op span guard.
    pub struct SpanGuard;
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API surface (stable regardless of feature flag)
// ─────────────────────────────────────────────────────────────────────────────

/// A span name; accepts `&'static str`, `String`, or `Cow<'static, str>`.
pub struct SpanName(pub Cow<'static, str>);

impl From<&'static str> for SpanName {
    fn from(s: &'static str) -> Self {
        SpanName(Cow::Borrowed(s))
    }
}
impl From<String> for SpanName {
    fn from(s: String) -> Self {
        SpanName(Cow::Owned(s))
    }
}
impl From<Cow<'static, str>> for SpanName {
    fn from(s: Cow<'static, str>) -> Self {
        SpanName(s)
    }
}

/// Aggregate timing of one span name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStats {
    /// Number of completed spans.
    pub count: u64,

    /// Sum of span durations.
    pub total: Duration,

    /// Longest single span.
    pub max: Duration,
}

// Re-export correct backend
#[cfg(feature = "profiling")]
pub use enabled::SpanGuard;

#[cfg(not(feature = "profiling"))]
pub use disabled::SpanGuard;

#[cfg(feature = "profiling")]
pub use enabled::{init, report, reset, shutdown, span};

#[cfg(not(feature = "profiling"))]
pub use disabled::{init, report, reset, shutdown, span};
