//! Error types for portable storage encoding and decoding.
//!
//! Every failure is fatal for the call that produced it: the codec never
//! recovers locally, never pads a short stream and never hands back a
//! partially decoded tree.
//!
//! ## Error Categories
//!
//! [`Error::kind`] folds the individual variants into a small taxonomy that
//! callers at the RPC boundary can act on:
//!
//! - **Format**: bad signature, unsupported version, unknown type tag,
//!   invalid key length, depth limit, heterogeneous arrays, duplicate keys
//! - **TruncatedStream**: a field declares more bytes than remain
//! - **UnsupportedType**: `double` values, and serde shapes with no wire form
//! - **ValueOutOfRange**: an integer does not fit its requested width
//! - **SizeTooLarge**: a count or length exceeds the 62-bit raw size ceiling
//!
//! ## Examples
//!
//! ```rust
//! use portable_storage::{decode_stream, ErrorKind};
//!
//! let err = decode_stream(b"\x00\x11\x01\x01\x01\x01\x02\x01\x01\x00").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Format);
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while encoding or decoding
/// a portable storage stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error while reading from a source or writing to a sink
    #[error("IO error: {0}")]
    Io(String),

    /// The first eight bytes are not the portable storage signature
    #[error("Bad signature: expected 01 11 01 01 01 01 02 01, found {found:02x?}")]
    BadSignature { found: [u8; 8] },

    /// The format version byte is not one this codec understands
    #[error("Unsupported format version {0} (expected 1)")]
    UnsupportedVersion(u8),

    /// A type tag byte outside the known set
    #[error("Unknown type tag 0x{tag:02x} at offset {offset}")]
    UnknownTypeTag { tag: u8, offset: usize },

    /// Section keys are length-prefixed by a single byte and may not be empty
    #[error("Invalid section key length {0} (must be 1..=255 bytes)")]
    InvalidKeyLength(usize),

    /// A section key that is not valid UTF-8
    #[error("Section key at offset {offset} is not valid UTF-8")]
    InvalidKey { offset: usize },

    /// A key appeared twice in one section and the decoder rejects duplicates
    #[error("Duplicate section key \"{0}\"")]
    DuplicateKey(String),

    /// Array elements do not share one base type
    #[error("Heterogeneous array: expected {expected} elements, found {found}")]
    HeterogeneousArray {
        expected: &'static str,
        found: &'static str,
    },

    /// The format has no tag for an array whose elements are arrays
    #[error("Arrays of arrays cannot be encoded")]
    NestedArray,

    /// Sections and arrays are nested deeper than the configured limit
    #[error("Nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    /// Bytes left over after the root section
    #[error("{0} trailing bytes after the root section")]
    TrailingBytes(usize),

    /// The top-level value of a stream must be a section
    #[error("Stream root must be a section, found {0}")]
    RootNotSection(&'static str),

    /// Fewer bytes remain than a field declares it needs
    #[error("Truncated stream at offset {offset}: need {need} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        need: usize,
        remaining: usize,
    },

    /// A type with no supported wire representation
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// An integer does not fit the width and signedness it is written with
    #[error("Value {value} does not fit in {ty}")]
    ValueOutOfRange { value: i128, ty: &'static str },

    /// A count or length above the largest raw size (2^62 - 1)
    #[error("Size {0} exceeds the raw size limit")]
    SizeTooLarge(u64),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Format,
    TruncatedStream,
    UnsupportedType,
    ValueOutOfRange,
    SizeTooLarge,
    Io,
    Custom,
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::UnsupportedVersion(2).kind(), ErrorKind::Format);
    /// assert_eq!(Error::SizeTooLarge(u64::MAX).kind(), ErrorKind::SizeTooLarge);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadSignature { .. }
            | Error::UnsupportedVersion(_)
            | Error::UnknownTypeTag { .. }
            | Error::InvalidKeyLength(_)
            | Error::InvalidKey { .. }
            | Error::DuplicateKey(_)
            | Error::HeterogeneousArray { .. }
            | Error::NestedArray
            | Error::DepthLimitExceeded(_)
            | Error::TrailingBytes(_)
            | Error::RootNotSection(_) => ErrorKind::Format,
            Error::Truncated { .. } => ErrorKind::TruncatedStream,
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::ValueOutOfRange { .. } => ErrorKind::ValueOutOfRange,
            Error::SizeTooLarge(_) => ErrorKind::SizeTooLarge,
            Error::Io(_) => ErrorKind::Io,
            Error::Custom(_) => ErrorKind::Custom,
        }
    }

    /// Creates a truncation error for a read of `need` bytes at `offset`.
    pub fn truncated(offset: usize, need: usize, remaining: usize) -> Self {
        Error::Truncated {
            offset,
            need,
            remaining,
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for source or sink failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
