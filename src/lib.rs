//! Platform abstraction layer for a 2D-GPU command-execution engine.
//!
//! The GPU consumes command lists from a ring buffer and raises an interrupt
//! as each one retires; the application side issues commands, allocates
//! buffers, and blocks until a given command list has completed. This crate
//! provides everything between those two sides:
//!
//! - a buffer allocator over the host heap and up to eight fixed-address
//!   memory pools,
//! - the command ring storage,
//! - a monotonic completion tracker updated only from the interrupt path,
//! - interchangeable wait strategies (busy, counting semaphore, task
//!   notification, kernel semaphore) behind one `wait-for-event` primitive,
//! - a small set of named mutexes for the shared ring/allocator/cache-flush
//!   state.
//!
//! Everything is owned by a single [`context::Gpu2dContext`], constructed
//! once at startup from a [`device::Gpu2dDevice`] implementation and a
//! [`context::PalConfig`].

pub mod completion;
pub mod context;
pub mod device;
pub mod error;
pub mod memory;
pub mod ring;
pub mod sync;

pub use completion::CompletionTracker;
pub use context::{Gpu2dContext, PalConfig};
pub use device::Gpu2dDevice;
pub use error::{PalError, PalResult};
pub use memory::{Buffer, BufferSource, MemoryPoolDescriptor};
pub use ring::RingBuffer;
pub use sync::{Resource, WaitStrategy};
