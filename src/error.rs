use thiserror::Error;

#[derive(Error, Debug)]
pub enum PalError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Out of memory: {requested} bytes from {backing}")]
    AllocationExhausted {
        requested: usize,
        backing: &'static str,
    },

    #[error("Invalid resource id: {0}")]
    InvalidResource(u32),

    #[error("Subsystem used before init: {0}")]
    Uninitialized(&'static str),

    #[error("Completion signal lost: {0}")]
    LostCompletionSignal(&'static str),
}

// A convenient alias
pub type PalResult<T> = Result<T, PalError>;
