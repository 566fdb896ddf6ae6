use std::sync::{Condvar, Mutex};

/// Counting semaphore backing the `Semaphore` wait strategy.
///
/// A plain condition flag would lose a completion signal that lands between
/// the waiter's counter check and its block; a token count cannot. Tokens
/// posted with no waiter present are consumed by the next wait.
#[derive(Debug, Default)]
pub struct CountingSemaphore {
    tokens: Mutex<u64>,
    cv: Condvar,
}

impl CountingSemaphore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tokens: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    /// Adds one token and wakes one waiter if any is blocked.
    pub fn post(&self) {
        let mut tokens = self.tokens.lock().expect("Poisoned semaphore");
        *tokens += 1;
        self.cv.notify_one();
    }

    /// Blocks until a token is available, then consumes it.
    pub fn wait(&self) {
        let mut tokens = self.tokens.lock().expect("Poisoned semaphore");
        while *tokens == 0 {
            tokens = self.cv.wait(tokens).expect("Poisoned semaphore");
        }
        *tokens -= 1;
    }
}
