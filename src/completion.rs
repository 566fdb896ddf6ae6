use crate::error::{PalError, PalResult};
use crate::sync::EventBackend;
use std::sync::atomic::{AtomicI64, Ordering};

/// Counter value before [`CompletionTracker::reset`] has run.
pub const CL_ID_UNINITIALIZED: i64 = -1;

/// Highest command-list id the GPU has finished executing.
///
/// Written only by the completion-interrupt path (Release), read by waiters
/// (Acquire). `fetch_max` keeps the counter monotonic even if an out-of-order
/// id slips in from a misbehaving upstream.
pub struct CompletionTracker {
    last_cl_id: AtomicI64,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_cl_id: AtomicI64::new(CL_ID_UNINITIALIZED),
        }
    }

    /// Moves the counter from its uninitialized sentinel to zero. Called
    /// once, after the ring and wait primitives exist.
    pub fn reset(&self) {
        self.last_cl_id.store(0, Ordering::Release);
    }

    /// Latest retired command-list id.
    #[must_use]
    pub fn last_completed(&self) -> i64 {
        self.last_cl_id.load(Ordering::Acquire)
    }

    /// Interrupt-side update. Lock-free; ids never move the counter
    /// backwards, and a lower-than-current id is flagged as an upstream
    /// programming error instead of being absorbed silently.
    pub fn record_completion(&self, cl_id: u32) {
        let id = i64::from(cl_id);
        let prev = self.last_cl_id.fetch_max(id, Ordering::Release);
        if prev > id {
            eprintln!("[CompletionTracker] command list id went backwards: {prev} -> {id}");
        }
    }

    /// Blocks until at least command list `cl_id` has completed.
    ///
    /// The retry loop, not the single wait call, carries the correctness:
    /// every iteration re-reads the counter with Acquire, which is what
    /// keeps the busy-wait backend valid and makes a signal-before-wait
    /// interleaving return immediately.
    pub fn wait_until(&self, cl_id: u32, backend: &EventBackend) -> PalResult<()> {
        let target = i64::from(cl_id);
        loop {
            let last = self.last_completed();
            if last == CL_ID_UNINITIALIZED {
                return Err(PalError::Uninitialized("completion tracker"));
            }
            if last >= target {
                return Ok(());
            }
            backend.wait_for_event()?;
        }
    }
}
