//! # portable_storage
//!
//! A Serde-compatible codec for the portable storage binary format.
//!
//! ## What is portable storage?
//!
//! Portable storage is the compact, self-describing binary encoding used for
//! RPC request and response bodies between cryptocurrency nodes and wallets.
//! A stream is a fixed header followed by one root section: a string-keyed
//! map whose values carry their own type tags. Integers have fixed widths,
//! strings are raw byte blobs and arrays are homogeneous.
//!
//! ## Key Features
//!
//! - **Serde Compatible**: works with existing Rust types via `#[derive(Serialize, Deserialize)]`
//! - **Width Preserving**: the same tree always encodes to the same bytes, and
//!   decoded integers keep their wire width
//! - **Hardened Decoding**: depth limit, duplicate-key policy and length checks
//!   before any allocation
//! - **No Unsafe Code**: written entirely in safe Rust
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use portable_storage::{from_slice, to_vec};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct GetBlocks {
//!     start_height: u64,
//!     prune: bool,
//!     block_ids: Vec<String>,
//! }
//!
//! let request = GetBlocks {
//!     start_height: 1024,
//!     prune: true,
//!     block_ids: vec!["a1".to_string(), "b2".to_string()],
//! };
//!
//! let bytes = to_vec(&request).unwrap();
//! let back: GetBlocks = from_slice(&bytes).unwrap();
//! assert_eq!(request, back);
//! ```
//!
//! ### Dynamic Values with the storage! Macro
//!
//! ```rust
//! use portable_storage::{decode_stream, encode_stream, storage, Value};
//!
//! let data = storage!({
//!     "status": "OK",
//!     "height": 3000000,
//!     "untrusted": false
//! });
//!
//! let Value::Section(root) = data else { unreachable!() };
//! let bytes = encode_stream(&root).unwrap();
//! assert_eq!(decode_stream(&bytes).unwrap(), root);
//! ```
//!
//! ## Type Mapping
//!
//! | Rust | Wire |
//! |------|------|
//! | `i8`..`i64`, `u8`..`u64` | integer of the same width |
//! | `i128`, `u128` | smallest integer that fits, at most 64 bits |
//! | `bool` | bool |
//! | `String`, `&str`, `char`, bytes | string |
//! | `Vec<T>`, tuples whose elements share one type | array |
//! | structs, maps (integer keys as decimal strings) | section |
//! | `Option::None` field | omitted from the section |
//! | unit enum variant | string holding the variant name |
//! | other enum variants | single-entry section keyed by the variant name |
//! | `f32`, `f64`, `()` | unsupported |
//!
//! See the [`format`] module for the byte layout.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Declared counts are checked against the remaining input before allocation
//! - Nesting depth is bounded by [`StorageOptions::max_depth`]
//! - No panics in the public API

pub mod de;
pub mod error;
pub mod format;
pub mod macros;
pub mod map;
pub mod options;
pub mod raw_size;
pub mod ser;
pub mod value;

pub use de::{from_value, Deserializer};
pub use error::{Error, ErrorKind, Result};
pub use map::Section;
pub use options::{DuplicateKeys, StorageOptions};
pub use ser::Serializer;
pub use value::{IntType, Integer, Value};

use serde::{Deserialize, Serialize};
use std::io;

/// Serialize any `T: Serialize` to a portable storage stream.
///
/// `T` must serialize as a map or struct, since a stream's root is always a
/// section.
///
/// # Examples
///
/// ```rust
/// use portable_storage::to_vec;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Ping { a: u8 }
///
/// let bytes = to_vec(&Ping { a: 1 }).unwrap();
/// assert_eq!(
///     bytes,
///     [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x04, 0x01, b'a', 0x08, 0x01]
/// );
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized (e.g., floats, or a
/// root that is not a section).
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_vec_with_options(value, StorageOptions::default())
}

/// Serialize any `T: Serialize` to a portable storage stream with custom options.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options<T>(value: &T, options: StorageOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    match ser::to_value_with(value, &options)? {
        Value::Section(root) => encode_stream_with_options(&root, options),
        other => Err(Error::RootNotSection(other.kind_name())),
    }
}

/// Convert any `T: Serialize` to a [`Value`].
///
/// Integers keep the width of their Rust type.
///
/// # Examples
///
/// ```rust
/// use portable_storage::{to_value, IntType};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert!(value.is_section());
/// let x = value.get("x").and_then(|v| v.as_integer()).unwrap();
/// assert_eq!(x.pinned_type(), Some(IntType::Int32));
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    ser::to_value_with(value, &StorageOptions::default())
}

/// Serialize any `T: Serialize` to a writer as a portable storage stream.
///
/// # Examples
///
/// ```rust
/// use portable_storage::to_writer;
/// use std::collections::BTreeMap;
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &BTreeMap::from([("ok", true)])).unwrap();
/// assert_eq!(buffer.len(), 15);
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    to_writer_with_options(writer, value, StorageOptions::default())
}

/// Serialize any `T: Serialize` to a writer with custom options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, T>(mut writer: W, value: &T, options: StorageOptions) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let bytes = to_vec_with_options(value, options)?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Encode a root section as a complete stream: header, then the section
/// without a leading type tag.
///
/// # Examples
///
/// ```rust
/// use portable_storage::{encode_stream, Section};
///
/// let bytes = encode_stream(&Section::new()).unwrap();
/// assert_eq!(bytes, [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x00]);
/// ```
///
/// # Errors
///
/// Returns an error if any value in the tree cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode_stream(root: &Section) -> Result<Vec<u8>> {
    encode_stream_with_options(root, StorageOptions::default())
}

/// Encode a root section with custom options.
///
/// # Errors
///
/// Returns an error if any value in the tree cannot be encoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode_stream_with_options(root: &Section, options: StorageOptions) -> Result<Vec<u8>> {
    let mut serializer = Serializer::new(options);
    serializer.write_stream(root)?;
    Ok(serializer.into_inner())
}

/// Decode a complete stream into its root section.
///
/// Integers in the returned tree are pinned to the type they were read as.
///
/// # Examples
///
/// ```rust
/// use portable_storage::{decode_stream, Value};
///
/// let bytes = [
///     0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01,
///     0x04, 0x01, b'a', 0x08, 0x01,
/// ];
/// let root = decode_stream(&bytes).unwrap();
/// assert_eq!(root.get("a"), Some(&Value::from(1)));
/// ```
///
/// # Errors
///
/// Returns an error if the stream is malformed, truncated or violates a
/// configured limit.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode_stream(bytes: &[u8]) -> Result<Section> {
    decode_stream_with_options(bytes, StorageOptions::default())
}

/// Decode a complete stream with custom options.
///
/// # Errors
///
/// Returns an error if the stream is malformed, truncated or violates a
/// configured limit.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode_stream_with_options(bytes: &[u8], options: StorageOptions) -> Result<Section> {
    Deserializer::with_options(bytes, options).read_stream()
}

/// Deserialize an instance of type `T` from a portable storage stream.
///
/// # Examples
///
/// ```rust
/// use portable_storage::from_slice;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Ping { a: u32 }
///
/// let bytes = [
///     0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01,
///     0x04, 0x01, b'a', 0x08, 0x01,
/// ];
/// let ping: Ping = from_slice(&bytes).unwrap();
/// assert_eq!(ping, Ping { a: 1 });
/// ```
///
/// # Errors
///
/// Returns an error if the stream is malformed or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<'a, T>(v: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    from_slice_with_options(v, StorageOptions::default())
}

/// Deserialize an instance of type `T` from a stream with custom options.
///
/// # Errors
///
/// Returns an error if the stream is malformed, violates a configured limit
/// or cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with_options<'a, T>(v: &'a [u8], options: StorageOptions) -> Result<T>
where
    T: Deserialize<'a>,
{
    let mut deserializer = Deserializer::with_options(v, options);
    T::deserialize(&mut deserializer)
}

/// Deserialize an instance of type `T` from an I/O stream.
///
/// The reader is drained to its end before decoding starts.
///
/// # Examples
///
/// ```rust
/// use portable_storage::from_reader;
/// use std::collections::BTreeMap;
/// use std::io::Cursor;
///
/// let bytes = [
///     0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01,
///     0x04, 0x01, b'a', 0x08, 0x01,
/// ];
/// let map: BTreeMap<String, u8> = from_reader(Cursor::new(bytes)).unwrap();
/// assert_eq!(map["a"], 1);
/// ```
///
/// # Errors
///
/// Returns an error if reading from the reader fails, the stream is
/// malformed, or the data cannot be deserialized to type `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: for<'de> Deserialize<'de>,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Daemon {
        height: u64,
        status: String,
        synchronized: bool,
        peers: Vec<String>,
    }

    #[test]
    fn test_serialize_deserialize_point() {
        let point = Point { x: 1, y: -2 };
        let bytes = to_vec(&point).unwrap();
        let point_back: Point = from_slice(&bytes).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_serialize_deserialize_daemon() {
        let daemon = Daemon {
            height: 3_141_592,
            status: "OK".to_string(),
            synchronized: true,
            peers: vec!["10.0.0.1:18080".to_string(), "10.0.0.2:18080".to_string()],
        };

        let bytes = to_vec(&daemon).unwrap();
        let daemon_back: Daemon = from_slice(&bytes).unwrap();
        assert_eq!(daemon, daemon_back);
    }

    #[test]
    fn test_to_value() {
        let value = to_value(&Point { x: 1, y: 2 }).unwrap();

        match value {
            Value::Section(section) => {
                assert_eq!(section.get("x"), Some(&Value::from(1)));
                assert_eq!(section.get("y"), Some(&Value::from(2)));
            }
            _ => panic!("Expected section"),
        }
    }

    #[test]
    fn test_root_must_be_section() {
        assert_eq!(
            to_vec(&vec![1, 2, 3]),
            Err(Error::RootNotSection("array"))
        );
        assert!(matches!(to_vec(&42u8), Err(Error::RootNotSection(_))));
    }

    #[test]
    fn test_stream_roundtrip() {
        let root = match crate::storage!({
            "a": 1,
            "list": [1, 2, 3],
            "inner": { "flag": true }
        }) {
            Value::Section(section) => section,
            _ => panic!("Expected section"),
        };

        let bytes = encode_stream(&root).unwrap();
        assert_eq!(decode_stream(&bytes).unwrap(), root);
    }

    #[test]
    fn test_writer_and_reader() {
        let point = Point { x: 7, y: 8 };
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &point).unwrap();
        assert_eq!(buffer, to_vec(&point).unwrap());

        let point_back: Point = from_reader(std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(point, point_back);
    }
}
