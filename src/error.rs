use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The append (including the one reserved bit for the next sample) does
    /// not fit in the chunk; the chunk is left unchanged. Rotate to a new
    /// chunk to continue.
    #[error("chunk capacity exceeded")]
    CapacityExceeded,
    /// Serialized chunk is shorter than its header or buffer requires.
    #[error("truncated chunk: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    /// Serialized chunk header fields are mutually inconsistent.
    #[error("inconsistent chunk header")]
    InvalidHeader,
}
