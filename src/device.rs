/// Register offsets of the 2D command processor, as seen through
/// [`Gpu2dDevice::read_reg`] / [`Gpu2dDevice::write_reg`].
///
/// Only the offsets the platform layer and its drivers actually touch are
/// listed here; the full map belongs to the GPU library.
pub mod regs {
    /// Core status word. Bit 0 set while a command list is executing.
    pub const STATUS: u32 = 0x000;
    /// Id of the command list most recently retired by the core.
    pub const CLID: u32 = 0x148;
    /// Breakpoint status. Non-zero once the core has parked on a breakpoint.
    pub const BREAKPOINT: u32 = 0x080;
    /// Bus address of the command ring.
    pub const RING_BASE: u32 = 0x0F0;
    /// Capacity of the command ring in bytes.
    pub const RING_SIZE: u32 = 0x0F4;
    /// Write-1-to-clear interrupt acknowledge.
    pub const IRQ_CLEAR: u32 = 0x0F8;
}

/// The narrow hardware interface the platform layer consumes.
///
/// One implementation per board/simulator. Register access must be safe to
/// call from any context, including the completion interrupt path;
/// implementations must not take locks the application side also takes.
pub trait Gpu2dDevice: Send + Sync {
    /// Read a 32-bit command-processor register.
    fn read_reg(&self, reg: u32) -> u32;

    /// Write a 32-bit command-processor register.
    fn write_reg(&self, reg: u32, value: u32);

    /// Clean and invalidate the data cache over `[base, base + size)`.
    ///
    /// Called only under the cache-flush lock and only when the platform is
    /// configured with cacheable graphics memory. The default is a no-op,
    /// which is correct for coherent/non-cacheable configurations.
    fn flush_dcache(&self, _base: *const u8, _size: usize) {}
}
