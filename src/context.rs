#![allow(clippy::cast_possible_truncation)]

use crate::completion::CompletionTracker;
use crate::device::{Gpu2dDevice, regs};
use crate::error::PalResult;
use crate::memory::{Buffer, BufferAllocator, MemoryPoolDescriptor};
use crate::ring::RingBuffer;
use crate::sync::{EventBackend, MutexSet, Resource, ResourceGuard, WaitStrategy};
use std::sync::Arc;

/// Default command ring capacity in bytes.
pub const DEFAULT_RING_SIZE: usize = 1024;

/// Startup configuration for one platform context.
///
/// Strategy and pool table are fixed at construction time; there is no
/// runtime re-selection.
#[derive(Debug, Clone)]
pub struct PalConfig {
    pub ring_size: usize,
    pub wait_strategy: WaitStrategy,
    /// Whether more than one application context may call in. When false the
    /// named mutexes degenerate to no-ops.
    pub concurrent: bool,
    /// Whether graphics memory is cacheable and buffer flushes must perform
    /// real cache maintenance.
    pub cached_memory: bool,
    pub pools: Vec<MemoryPoolDescriptor>,
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            ring_size: DEFAULT_RING_SIZE,
            wait_strategy: WaitStrategy::default(),
            concurrent: true,
            cached_memory: false,
            pools: Vec::new(),
        }
    }
}

impl PalConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn ring_size(mut self, bytes: usize) -> Self {
        self.ring_size = bytes;
        self
    }

    #[must_use]
    pub const fn wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.wait_strategy = strategy;
        self
    }

    #[must_use]
    pub const fn single_context(mut self) -> Self {
        self.concurrent = false;
        self
    }

    #[must_use]
    pub const fn cached_memory(mut self) -> Self {
        self.cached_memory = true;
        self
    }

    #[must_use]
    pub fn pool(mut self, base_addr: u64, size: usize) -> Self {
        self.pools.push(MemoryPoolDescriptor { base_addr, size });
        self
    }
}

/// The platform context: everything the GPU library calls into, constructed
/// once at startup and passed by reference from then on.
///
/// Replaces the usual pile of process globals (device handle, ring struct,
/// completion counter, mutex table) with one owned object.
pub struct Gpu2dContext {
    device: Arc<dyn Gpu2dDevice>,
    config: PalConfig,
    mutexes: MutexSet,
    backend: EventBackend,
    allocator: BufferAllocator,
    ring: RingBuffer,
    tracker: CompletionTracker,
}

impl Gpu2dContext {
    /// Brings the platform layer up: lock table, wait primitive, memory
    /// pools, ring storage, and finally the completion counter.
    ///
    /// The calling thread is registered as the notification target when the
    /// `TaskNotify` strategy is selected, so init must run on the thread
    /// that will issue waits.
    ///
    /// # Errors
    /// Ring allocation failure is fatal for the command engine and is
    /// propagated as-is; backend construction can fail when the host kernel
    /// refuses a semaphore.
    pub fn init(device: Arc<dyn Gpu2dDevice>, config: PalConfig) -> PalResult<Self> {
        let mutexes = MutexSet::new(config.concurrent);

        let backend = EventBackend::new(config.wait_strategy)?;
        backend.register_waiter();

        let allocator = BufferAllocator::new(&config.pools)?;

        let ring = RingBuffer::init(&allocator, config.ring_size)?;

        // Hand the ring to the command processor.
        device.write_reg(regs::RING_BASE, ring.base_phys() as u32);
        device.write_reg(regs::RING_SIZE, ring.capacity() as u32);

        let tracker = CompletionTracker::new();
        tracker.reset();

        Ok(Self {
            device,
            config,
            mutexes,
            backend,
            allocator,
            ring,
            tracker,
        })
    }

    // ===========================================================================================
    // Register access
    // ===========================================================================================

    #[must_use]
    pub fn reg_read(&self, reg: u32) -> u32 {
        self.device.read_reg(reg)
    }

    pub fn reg_write(&self, reg: u32, value: u32) {
        self.device.write_reg(reg, value);
    }

    // ===========================================================================================
    // Buffers
    // ===========================================================================================

    /// Allocates a buffer from the default host heap.
    pub fn create_buffer(&self, size: usize) -> PalResult<Buffer> {
        self.allocator.create(size)
    }

    /// Allocates a buffer from the named static pool.
    pub fn create_buffer_from_pool(&self, pool_id: u8, size: usize) -> PalResult<Buffer> {
        self.allocator.create_from_pool(pool_id, size)
    }

    /// Releases a buffer to the backing store that produced it.
    pub fn destroy_buffer(&self, buffer: Buffer) {
        self.allocator.destroy(buffer);
    }

    /// Cache clean+invalidate over the buffer's range, serialized by the
    /// cache-flush lock. Documented no-op when graphics memory is
    /// configured non-cacheable.
    pub fn flush_buffer(&self, buffer: &Buffer) -> PalResult<()> {
        if !self.config.cached_memory {
            return Ok(());
        }

        let _guard = self.mutexes.lock(Resource::CacheFlush)?;
        self.device.flush_dcache(buffer.base_virt(), buffer.size());
        Ok(())
    }

    /// Bytes currently available in the named pool.
    pub fn pool_available(&self, pool_id: u8) -> PalResult<usize> {
        self.allocator.pool_available(pool_id)
    }

    // ===========================================================================================
    // Locking
    // ===========================================================================================

    /// Enters the named critical section; the guard releases it on drop.
    pub fn lock(&self, resource: Resource) -> PalResult<ResourceGuard<'_>> {
        self.mutexes.lock(resource)
    }

    // ===========================================================================================
    // Waiting
    // ===========================================================================================

    /// One blocking wait on the configured primitive. Most callers want
    /// [`Self::wait_for_cl`] instead.
    pub fn wait_for_event(&self) -> PalResult<()> {
        self.backend.wait_for_event()
    }

    /// Blocks until the GPU has retired at least command list `cl_id`.
    pub fn wait_for_cl(&self, cl_id: u32) -> PalResult<()> {
        self.tracker.wait_until(cl_id, &self.backend)
    }

    /// Blocks until the command processor parks on a breakpoint, polling
    /// the breakpoint status register between waits.
    pub fn wait_for_breakpoint(&self) -> PalResult<()> {
        while self.device.read_reg(regs::BREAKPOINT) == 0 {
            self.backend.wait_for_event()?;
        }
        Ok(())
    }

    /// Latest retired command-list id.
    #[must_use]
    pub fn last_completed_cl(&self) -> i64 {
        self.tracker.last_completed()
    }

    // ===========================================================================================
    // Interrupt entry
    // ===========================================================================================

    /// The command-list-complete interrupt entry point.
    ///
    /// Records the retired id and releases one blocked waiter. Takes no
    /// mutex; everything on this path is lock-free or async-signal-safe,
    /// which is what allows application-side allocator calls to block on
    /// their locks without deadlocking against the interrupt.
    pub fn completion_isr(&self, cl_id: u32) {
        self.tracker.record_completion(cl_id);
        self.backend.signal_from_isr();
    }

    // ===========================================================================================
    // Accessors
    // ===========================================================================================

    #[must_use]
    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    #[must_use]
    pub fn config(&self) -> &PalConfig {
        &self.config
    }
}

impl Drop for Gpu2dContext {
    fn drop(&mut self) {
        // The ring lives exactly as long as the context.
        if let Some(bo) = self.ring.release() {
            self.allocator.destroy(bo);
        }
    }
}
