//! Error types for codec operations.

use std::fmt;

/// Errors that can occur while decoding compressed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended in the middle of a token.
    UnexpectedEof { context: &'static str },
    /// Invalid data format or structure.
    InvalidFormat {
        context: &'static str,
        detail: String,
    },
    /// A back-reference points before the start of the output.
    OffsetOutOfRange { offset: usize, produced: usize },
    /// A decoded value does not fit the target integer type.
    ValueOutOfRange { index: usize, value: i64 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof { context } => {
                write!(f, "unexpected end of buffer in {context}")
            }
            Self::InvalidFormat { context, detail } => {
                write!(f, "invalid format in {context}: {detail}")
            }
            Self::OffsetOutOfRange { offset, produced } => {
                write!(
                    f,
                    "back-reference offset {offset} exceeds {produced} decoded bytes"
                )
            }
            Self::ValueOutOfRange { index, value } => {
                write!(f, "decoded value {value} at position {index} is out of range")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
