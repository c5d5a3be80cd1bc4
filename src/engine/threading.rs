//! # Implicit Multi-Threading Policy
//!
//! Process-wide switch recording whether the surrounding execution framework
//! will call [`FillHelper::exec`](crate::engine::helper::FillHelper::exec) from
//! several worker threads at once.
//!
//! The engine does not decide the thread count; it only *consults* this policy
//! when a helper is constructed, and refuses to build a helper over a storage
//! without atomic updates while the policy is on.
//!
//! ## Concurrency
//! The state lives in two atomics. Toggling the policy while helpers are being
//! constructed on other threads is allowed; each construction observes one
//! consistent snapshot of the enabled flag.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};


static IMPLICIT_MT: AtomicBool = AtomicBool::new(false);
static POOL_SIZE: AtomicUsize = AtomicUsize::new(1);

/// Enables implicit multi-threading with the given worker count.
///
/// A count of `0` selects the number of logical CPUs as reported by rayon.
pub fn enable_implicit_mt(threads: usize) {
    let threads = if threads == 0 { rayon::current_num_threads() } else { threads };
    POOL_SIZE.store(threads, Ordering::Release);
    IMPLICIT_MT.store(true, Ordering::Release);
    log::debug!("implicit multithreading enabled with {threads} threads");
}

/// Disables implicit multi-threading.
pub fn disable_implicit_mt() {
    IMPLICIT_MT.store(false, Ordering::Release);
    POOL_SIZE.store(1, Ordering::Release);
    log::debug!("implicit multithreading disabled");
}

/// Returns `true` if implicit multi-threading is enabled.
#[inline]
pub fn is_implicit_mt_enabled() -> bool {
    IMPLICIT_MT.load(Ordering::Acquire)
}

/// Worker count recorded by the policy (`1` when disabled).
#[inline]
pub fn pool_size() -> usize {
    POOL_SIZE.load(Ordering::Acquire)
}

/// RAII guard that enables implicit multi-threading and restores the previous
/// policy on drop.
///
/// Mostly useful in tests and benchmarks that must not leak the global switch.
pub struct ImplicitMtGuard {
    was_enabled: bool,
    previous_size: usize,
}

impl ImplicitMtGuard {
    /// Enables implicit multi-threading for the guard's lifetime.
    pub fn enable(threads: usize) -> Self {
        let guard = Self { was_enabled: is_implicit_mt_enabled(), previous_size: pool_size() };
        enable_implicit_mt(threads);
        guard
    }

    /// Disables implicit multi-threading for the guard's lifetime.
    pub fn disable() -> Self {
        let guard = Self { was_enabled: is_implicit_mt_enabled(), previous_size: pool_size() };
        disable_implicit_mt();
        guard
    }
}

impl Drop for ImplicitMtGuard {
    fn drop(&mut self) {
        if self.was_enabled {
            enable_implicit_mt(self.previous_size);
        } else {
            disable_implicit_mt();
        }
    }
}
