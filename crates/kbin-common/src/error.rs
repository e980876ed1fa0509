//! Error types for kbin-common.

use thiserror::Error;

/// Common error type for kbin buffer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A read went past the populated length of the buffer.
    #[error("read out of bounds: needed {needed} bytes at offset {offset} but only {available} available")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A storage unit code that does not name any known primitive.
    #[error("invalid storage width code {0:?}")]
    InvalidWidth(char),

    /// A struct could not be read from the buffer.
    #[error("could not read {size}-byte struct at offset {offset}")]
    InvalidStruct { offset: usize, size: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
