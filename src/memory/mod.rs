pub mod allocator;
pub mod heap;
pub mod pool;

/// Hard cap on the number of configurable graphics memory pools.
pub const MAX_MEM_POOLS: usize = 8;

/// Which backing store produced a buffer, and therefore which deallocation
/// path must release it. Freeing through the wrong path corrupts the heap,
/// so the tag travels with the buffer instead of being inferred from any
/// other field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSource {
    /// Default host heap.
    HostHeap,
    /// One of the statically configured fixed-address pools.
    Pool(u8),
}

/// Static description of one graphics memory pool: a fixed-address region
/// reserved for a specific allocation category. Read-only after startup.
#[derive(Debug, Clone, Copy)]
pub struct MemoryPoolDescriptor {
    /// Physical base address of the region.
    pub base_addr: u64,
    /// Region size in bytes.
    pub size: usize,
}

/// One allocated, addressable memory region.
///
/// The virtual and physical addresses are simultaneously valid for the whole
/// lifetime of the buffer (allocation failures surface as errors, never as a
/// half-valid buffer), and `size` is fixed at creation.
#[derive(Debug)]
pub struct Buffer {
    ptr: *mut u8,
    phys: u64,
    size: usize,
    source: BufferSource,
}

// The region is exclusively owned by the Buffer until destroyed.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Buffer {
    pub(crate) const fn new(ptr: *mut u8, phys: u64, size: usize, source: BufferSource) -> Self {
        Self {
            ptr,
            phys,
            size,
            source,
        }
    }

    /// CPU virtual base address. On this platform virtual and bus address
    /// spaces coincide, so [`Self::map`] returns the same value.
    #[must_use]
    pub const fn base_virt(&self) -> *mut u8 {
        self.ptr
    }

    /// Bus address as seen by the GPU.
    #[must_use]
    pub const fn phys(&self) -> u64 {
        self.phys
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn source(&self) -> BufferSource {
        self.source
    }

    /// Makes the buffer CPU-addressable and returns the mapping.
    ///
    /// Identity operation here (no MMU aliasing between the two address
    /// spaces); kept for symmetry with architectures that translate.
    #[must_use]
    pub const fn map(&self) -> *mut u8 {
        self.ptr
    }

    /// Releases the CPU mapping. No-op counterpart of [`Self::map`].
    pub const fn unmap(&self) {}
}

pub use allocator::BufferAllocator;
pub use pool::MemoryPool;
