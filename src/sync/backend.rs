use crate::error::{PalError, PalResult};
use crate::sync::semaphore::CountingSemaphore;
use std::cell::UnsafeCell;
use std::io;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering, fence};
use std::thread::{self, Thread};

/// Which blocking primitive backs [`EventBackend::wait_for_event`].
///
/// Selected once at context construction, mirroring the four runtime
/// environments the layer targets: no OS at all, a lightweight RTOS
/// abstraction, a task-notification capable RTOS, and a separate real-time
/// kernel with its own semaphores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// No blocking primitive exists; `wait_for_event` returns immediately
    /// and correctness relies on the caller's retry loop re-reading the
    /// completion counter.
    Busy,
    /// Counting semaphore: the interrupt path posts one token per
    /// completion, waiters consume one token per call.
    #[default]
    Semaphore,
    /// Directed notification of a single registered waiter thread, with a
    /// permit token so an early signal is never lost.
    TaskNotify,
    /// Same token semantics as `Semaphore`, implemented against the host
    /// kernel's POSIX semaphore primitive.
    KernelSemaphore,
}

/// Targeted wake-up of one registered thread.
///
/// The permit flag is the memory of "already signaled": a signal that lands
/// before the waiter parks is consumed by the next wait instead of being
/// dropped. At most one thread may register; registration happens once,
/// before the first interrupt can fire.
#[derive(Debug, Default)]
pub struct TaskNotify {
    waiter: OnceLock<Thread>,
    permit: AtomicBool,
}

impl TaskNotify {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the calling thread as the notification target.
    pub fn register_current(&self) {
        let _ = self.waiter.set(thread::current());
    }

    /// Signal path. Lock-free and safe from interrupt context.
    pub fn signal(&self) {
        self.permit.store(true, Ordering::Release);
        if let Some(t) = self.waiter.get() {
            t.unpark();
        }
    }

    /// Blocks the registered thread until a permit is available.
    pub fn wait(&self) -> PalResult<()> {
        let registered = self
            .waiter
            .get()
            .ok_or(PalError::Uninitialized("task-notify waiter"))?;
        if registered.id() != thread::current().id() {
            return Err(PalError::Uninitialized("task-notify waiter"));
        }

        while !self.permit.swap(false, Ordering::Acquire) {
            // Spurious unparks are fine; the permit is rechecked.
            thread::park();
        }
        Ok(())
    }
}

/// Counting semaphore owned by the host kernel (`sem_t`).
///
/// Boxed by the backend so the `sem_t` never moves after `sem_init`.
/// `sem_post` is async-signal-safe, which is what makes this variant legal
/// to signal from a real interrupt/signal context.
pub struct PosixSemaphore {
    sem: UnsafeCell<libc::sem_t>,
}

impl std::fmt::Debug for PosixSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PosixSemaphore")
    }
}

unsafe impl Send for PosixSemaphore {}
unsafe impl Sync for PosixSemaphore {}

impl PosixSemaphore {
    pub fn new() -> io::Result<Box<Self>> {
        let boxed = Box::new(Self {
            sem: UnsafeCell::new(unsafe { std::mem::zeroed() }),
        });
        let rc = unsafe { libc::sem_init(boxed.sem.get(), 0, 0) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(boxed)
    }

    pub fn post(&self) {
        unsafe {
            libc::sem_post(self.sem.get());
        }
    }

    pub fn wait(&self) -> io::Result<()> {
        loop {
            let rc = unsafe { libc::sem_wait(self.sem.get()) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(err);
            }
        }
    }
}

impl Drop for PosixSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_destroy(self.sem.get());
        }
    }
}

/// The single `wait-for-event` primitive behind which all four strategies
/// hide. Waiters block in [`Self::wait_for_event`]; the completion interrupt
/// calls [`Self::signal_from_isr`], which takes no lock on any variant that
/// claims interrupt safety.
#[derive(Debug)]
pub enum EventBackend {
    Busy,
    Semaphore(CountingSemaphore),
    TaskNotify(TaskNotify),
    KernelSemaphore(Box<PosixSemaphore>),
}

impl EventBackend {
    pub fn new(strategy: WaitStrategy) -> PalResult<Self> {
        Ok(match strategy {
            WaitStrategy::Busy => Self::Busy,
            WaitStrategy::Semaphore => Self::Semaphore(CountingSemaphore::new()),
            WaitStrategy::TaskNotify => Self::TaskNotify(TaskNotify::new()),
            WaitStrategy::KernelSemaphore => Self::KernelSemaphore(PosixSemaphore::new()?),
        })
    }

    /// Registers the calling thread where the strategy needs a target.
    /// No-op for the token-counting variants.
    pub fn register_waiter(&self) {
        if let Self::TaskNotify(n) = self {
            n.register_current();
        }
    }

    /// Blocks until the interrupt path signals, except on `Busy` where it
    /// returns immediately after an acquire fence so the caller's re-read of
    /// the completion counter observes the interrupt's store.
    pub fn wait_for_event(&self) -> PalResult<()> {
        match self {
            Self::Busy => {
                fence(Ordering::Acquire);
                Ok(())
            }
            Self::Semaphore(sem) => {
                sem.wait();
                Ok(())
            }
            Self::TaskNotify(n) => n.wait(),
            Self::KernelSemaphore(sem) => sem
                .wait()
                .map_err(|_| PalError::LostCompletionSignal("sem_wait failed")),
        }
    }

    /// Interrupt-side release of one blocked waiter. Never blocks, never
    /// takes a mutex (the `Semaphore` variant is only used where the
    /// "interrupt" is itself a thread).
    pub fn signal_from_isr(&self) {
        match self {
            Self::Busy => {}
            Self::Semaphore(sem) => sem.post(),
            Self::TaskNotify(n) => n.signal(),
            Self::KernelSemaphore(sem) => sem.post(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn task_notify_signal_before_wait() {
        let n = TaskNotify::new();
        n.register_current();
        n.signal();
        n.wait().unwrap();
    }

    #[test]
    fn task_notify_rejects_unregistered_thread() {
        let n = TaskNotify::new();
        assert!(matches!(n.wait(), Err(PalError::Uninitialized(_))));
    }

    #[test]
    fn posix_semaphore_round_trip() {
        let sem = PosixSemaphore::new().unwrap();
        sem.post();
        sem.wait().unwrap();
    }

    #[test]
    fn kernel_semaphore_backend_cross_thread() {
        let backend = Arc::new(EventBackend::new(WaitStrategy::KernelSemaphore).unwrap());
        let signaler = Arc::clone(&backend);
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            signaler.signal_from_isr();
        });
        backend.wait_for_event().unwrap();
        t.join().unwrap();
    }

    #[test]
    fn busy_backend_never_blocks() {
        let backend = EventBackend::new(WaitStrategy::Busy).unwrap();
        backend.wait_for_event().unwrap();
        backend.wait_for_event().unwrap();
    }
}
