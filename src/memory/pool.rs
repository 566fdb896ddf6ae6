use crate::memory::MemoryPoolDescriptor;
use std::collections::BTreeMap;

const POOL_ALIGN: u64 = 8;

/// Offset allocator over one fixed-address memory region.
///
/// Tracks occupied ranges (start address -> size) in a `BTreeMap` and
/// allocates first-fit from the holes between them. The region itself is
/// never touched; only addresses are handed out, which is what a pool over
/// reserved graphics RAM needs.
#[derive(Debug)]
pub struct MemoryPool {
    base: u64,
    size: usize,
    // Occupied ranges: start address -> rounded size.
    allocations: BTreeMap<u64, u64>,
    in_use: usize,
}

impl MemoryPool {
    #[must_use]
    pub fn new(desc: &MemoryPoolDescriptor) -> Self {
        Self {
            base: desc.base_addr,
            size: desc.size,
            allocations: BTreeMap::new(),
            in_use: 0,
        }
    }

    const fn align_up(val: u64) -> u64 {
        (val + POOL_ALIGN - 1) & !(POOL_ALIGN - 1)
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.size
    }

    /// Bytes not currently handed out. After a balanced sequence of
    /// `alloc`/`free` calls this equals [`Self::capacity`].
    #[must_use]
    pub const fn bytes_available(&self) -> usize {
        self.size - self.in_use
    }

    /// First-fit allocation of `size` bytes. `None` when no hole is large
    /// enough.
    pub fn alloc(&mut self, size: usize) -> Option<u64> {
        if size == 0 || size > self.size {
            return None;
        }
        let request = Self::align_up(size as u64);
        let limit = self.base + self.size as u64;

        let mut candidate = self.base;
        for (&start, &len) in &self.allocations {
            if start > candidate && start - candidate >= request {
                break;
            }
            candidate = Self::align_up(start + len);
        }

        if candidate + request > limit {
            return None;
        }

        self.allocations.insert(candidate, request);
        self.in_use += request as usize;
        Some(candidate)
    }

    /// Returns a range obtained from [`Self::alloc`].
    pub fn free(&mut self, addr: u64) {
        match self.allocations.remove(&addr) {
            Some(len) => self.in_use -= len as usize,
            None => eprintln!("[MemoryPool] Tried to free 0x{addr:x} which was not tracked"),
        }
    }

    /// True if `addr` lies inside this pool's region.
    #[must_use]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size as u64
    }
}
