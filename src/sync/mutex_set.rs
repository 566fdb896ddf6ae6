use crate::error::PalResult;
use std::sync::{Mutex, MutexGuard};

/// The named mutual-exclusion resources shared between application contexts.
///
/// Each guards exactly one concern and no call path holds two of them at
/// once, so no lock-ordering protocol is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Resource {
    /// Command ring append/submit state.
    RingBuffer = 0,
    /// Allocator free-list and pool bookkeeping.
    Allocator = 1,
    /// Cache-maintenance instruction sequence (not re-entrant on some
    /// platforms).
    CacheFlush = 2,
}

pub const RESOURCE_COUNT: usize = 3;

enum Entry {
    /// Single-context configuration: locking is a successful no-op.
    Disabled,
    Lock(Mutex<()>),
}

/// RAII critical section over one named resource.
///
/// Dropping the guard releases the resource. On single-context builds the
/// guard is empty and acquisition/release cost nothing.
pub struct ResourceGuard<'a> {
    _inner: Option<MutexGuard<'a, ()>>,
}

/// Fixed table of the named locks, created once at init.
pub struct MutexSet {
    entries: [Entry; RESOURCE_COUNT],
}

impl MutexSet {
    /// Builds the set. With `concurrent` unset every entry is disabled,
    /// matching the bare-metal/single-thread build where no second context
    /// can exist.
    #[must_use]
    pub fn new(concurrent: bool) -> Self {
        let make = || {
            if concurrent {
                Entry::Lock(Mutex::new(()))
            } else {
                Entry::Disabled
            }
        };
        Self {
            entries: [make(), make(), make()],
        }
    }

    /// Acquires the named resource, blocking until it is free.
    ///
    /// Recursive acquisition by the same thread is undefined and must not be
    /// relied upon (it deadlocks on the real lock variants).
    pub fn lock(&self, resource: Resource) -> PalResult<ResourceGuard<'_>> {
        match &self.entries[resource as usize] {
            Entry::Disabled => Ok(ResourceGuard { _inner: None }),
            Entry::Lock(m) => Ok(ResourceGuard {
                _inner: Some(m.lock().expect("Poisoned resource lock")),
            }),
        }
    }
}
