use crate::error::{PalError, PalResult};
use crate::memory::pool::MemoryPool;
use crate::memory::{Buffer, BufferSource, MAX_MEM_POOLS, MemoryPoolDescriptor, heap};
use std::sync::{Mutex, MutexGuard};

struct AllocatorInner {
    pools: Vec<MemoryPool>,
}

/// Unified buffer allocator over the host heap and the configured pools.
///
/// All bookkeeping lives behind one mutex so the allocate/record-metadata
/// sequence is a single critical section; `destroy` routes through the
/// backing store named by the buffer's [`BufferSource`] tag.
pub struct BufferAllocator {
    inner: Mutex<AllocatorInner>,
}

impl BufferAllocator {
    /// Builds the allocator and initializes one pool per descriptor.
    ///
    /// # Errors
    /// `InvalidResource` when more than [`MAX_MEM_POOLS`] pools are
    /// configured.
    pub fn new(pool_table: &[MemoryPoolDescriptor]) -> PalResult<Self> {
        if pool_table.len() > MAX_MEM_POOLS {
            return Err(PalError::InvalidResource(pool_table.len() as u32));
        }

        let pools = pool_table.iter().map(MemoryPool::new).collect();
        Ok(Self {
            inner: Mutex::new(AllocatorInner { pools }),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, AllocatorInner> {
        self.inner.lock().expect("Poisoned allocator state")
    }

    /// Allocates `size` bytes from the default host heap.
    pub fn create(&self, size: usize) -> PalResult<Buffer> {
        let _inner = self.lock_inner();

        let ptr = heap::alloc(size)?;
        Ok(Buffer::new(ptr, ptr as u64, size, BufferSource::HostHeap))
    }

    /// Allocates `size` bytes from the named pool.
    ///
    /// # Errors
    /// `InvalidResource` for an unknown pool id, `AllocationExhausted` when
    /// the pool has no hole large enough. A failed request never corrupts
    /// the pool.
    pub fn create_from_pool(&self, pool_id: u8, size: usize) -> PalResult<Buffer> {
        let mut inner = self.lock_inner();

        let pool = inner
            .pools
            .get_mut(pool_id as usize)
            .ok_or(PalError::InvalidResource(u32::from(pool_id)))?;

        let addr = pool
            .alloc(size)
            .ok_or(PalError::AllocationExhausted {
                requested: size,
                backing: "memory pool",
            })?;

        Ok(Buffer::new(
            addr as *mut u8,
            addr,
            size,
            BufferSource::Pool(pool_id),
        ))
    }

    /// Releases the buffer to the backing store that produced it.
    pub fn destroy(&self, buffer: Buffer) {
        let mut inner = self.lock_inner();

        match buffer.source() {
            BufferSource::HostHeap => unsafe {
                heap::free(buffer.base_virt(), buffer.size());
            },
            BufferSource::Pool(id) => match inner.pools.get_mut(id as usize) {
                Some(pool) => pool.free(buffer.phys()),
                None => eprintln!("[BufferAllocator] destroy: unknown pool id {id}"),
            },
        }
    }

    /// Bytes currently available in the named pool.
    pub fn pool_available(&self, pool_id: u8) -> PalResult<usize> {
        let inner = self.lock_inner();
        inner
            .pools
            .get(pool_id as usize)
            .map(MemoryPool::bytes_available)
            .ok_or(PalError::InvalidResource(u32::from(pool_id)))
    }

    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.lock_inner().pools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pool() -> BufferAllocator {
        BufferAllocator::new(&[MemoryPoolDescriptor {
            base_addr: 0x200D_0000,
            size: 1664 * 1024,
        }])
        .unwrap()
    }

    #[test]
    fn heap_buffer_round_trip() {
        let alloc = one_pool();
        let bo = alloc.create(4096).unwrap();
        assert_eq!(bo.size(), 4096);
        assert!(!bo.map().is_null());
        assert_eq!(bo.phys(), bo.base_virt() as u64);
        alloc.destroy(bo);
    }

    #[test]
    fn pool_buffer_carries_source_tag() {
        let alloc = one_pool();
        let bo = alloc.create_from_pool(0, 512).unwrap();
        assert_eq!(bo.source(), BufferSource::Pool(0));
        assert_eq!(bo.size(), 512);
        alloc.destroy(bo);
        assert_eq!(alloc.pool_available(0).unwrap(), 1664 * 1024);
    }

    #[test]
    fn unknown_pool_is_invalid_resource() {
        let alloc = one_pool();
        assert!(matches!(
            alloc.create_from_pool(3, 64),
            Err(PalError::InvalidResource(3))
        ));
    }

    #[test]
    fn pool_exhaustion_is_reported_not_corrupted() {
        let alloc = BufferAllocator::new(&[MemoryPoolDescriptor {
            base_addr: 0x2000_0000,
            size: 1024,
        }])
        .unwrap();

        assert!(matches!(
            alloc.create_from_pool(0, 4096),
            Err(PalError::AllocationExhausted { requested: 4096, .. })
        ));
        assert_eq!(alloc.pool_available(0).unwrap(), 1024);
    }

    #[test]
    fn too_many_pools_rejected() {
        let descs = [MemoryPoolDescriptor {
            base_addr: 0,
            size: 64,
        }; 9];
        assert!(BufferAllocator::new(&descs).is_err());
    }
}
