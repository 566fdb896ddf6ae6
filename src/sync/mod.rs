pub mod backend;
pub mod mutex_set;
pub mod semaphore;

pub use backend::{EventBackend, WaitStrategy};
pub use mutex_set::{MutexSet, Resource, ResourceGuard};
pub use semaphore::CountingSemaphore;
