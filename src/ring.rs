use crate::error::PalResult;
use crate::memory::{Buffer, BufferAllocator};

/// The GPU command ring storage.
///
/// Exactly one exists per context. Its backing buffer is allocated and
/// mapped at init and is guaranteed not to move or be freed for the life of
/// the context; the cursor arithmetic over it belongs to the GPU library,
/// not to this layer.
pub struct RingBuffer {
    bo: Option<Buffer>,
}

impl RingBuffer {
    /// Allocates and maps `capacity` bytes of ring storage.
    ///
    /// # Errors
    /// Propagates the allocation failure; the command engine cannot run
    /// without its ring, so callers treat this as fatal.
    pub fn init(allocator: &BufferAllocator, capacity: usize) -> PalResult<Self> {
        let bo = allocator.create(capacity)?;
        let _mapped = bo.map();
        Ok(Self { bo: Some(bo) })
    }

    fn bo(&self) -> &Buffer {
        self.bo.as_ref().expect("ring storage already released")
    }

    /// Mapped CPU address of the ring.
    #[must_use]
    pub fn base_virt(&self) -> *mut u8 {
        self.bo().base_virt()
    }

    /// Bus address the GPU fetches commands from.
    #[must_use]
    pub fn base_phys(&self) -> u64 {
        self.bo().phys()
    }

    /// Ring capacity in bytes. Fixed after init.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bo().size()
    }

    /// Hands the backing buffer back for teardown. Only the owning context
    /// calls this, on drop.
    pub(crate) fn release(&mut self) -> Option<Buffer> {
        self.bo.take()
    }
}
