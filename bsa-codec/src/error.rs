//! Error types for the codec layer

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Codec error types
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input ran out while more bits or bytes were still required
    #[error("input exhausted while more data was required")]
    TruncatedInput,

    /// A run-length token would produce more bytes than remain in the line
    #[error("run-length token produces {token} bytes with only {remaining} left in the line")]
    LineOverrun { token: usize, remaining: usize },

    /// The run-length encoder needs at least two pending bytes to classify
    /// a sequence
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// No offset-table entry matches the high bits of a match offset
    #[error("no offset code for high bits {0:#04x}")]
    InvalidOffsetHighBits(u16),
}
