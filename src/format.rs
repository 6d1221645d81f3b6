//! Portable storage wire format.
//!
//! This module documents the byte layout implemented by this library and
//! holds the constants both halves of the codec share.
//!
//! # Stream Framing
//!
//! Every stream starts with a fixed 9-byte header:
//!
//! ```text
//! 01 11 01 01 01 01 02 01   signature
//! 01                        format version
//! ```
//!
//! The header is followed by exactly one root section, written **without** a
//! leading type tag since the stream itself implies it.
//!
//! # Raw Sizes
//!
//! Counts and string lengths use a variable width integer whose two low bits
//! select the field width:
//!
//! | Marker | Width | Largest value |
//! |--------|-------|---------------|
//! | `0`    | 1     | 2^6 - 1       |
//! | `1`    | 2     | 2^14 - 1      |
//! | `2`    | 4     | 2^30 - 1      |
//! | `3`    | 8     | 2^62 - 1      |
//!
//! The field holds `(n << 2) | marker` in little-endian order.
//!
//! # Type Tags
//!
//! | Tag  | Kind    | Payload |
//! |------|---------|---------|
//! | `1`  | int64   | 8 bytes LE, two's complement |
//! | `2`  | int32   | 4 bytes |
//! | `3`  | int16   | 2 bytes |
//! | `4`  | int8    | 1 byte |
//! | `5`  | uint64  | 8 bytes LE |
//! | `6`  | uint32  | 4 bytes |
//! | `7`  | uint16  | 2 bytes |
//! | `8`  | uint8   | 1 byte |
//! | `9`  | double  | reserved, never encoded or decoded |
//! | `10` | string  | raw size + raw bytes |
//! | `11` | bool    | 1 byte, `0` or `1` |
//! | `12` | section | raw size entry count + entries |
//!
//! Setting bit `0x80` on a tag marks an array of the base kind in the low
//! seven bits. An array is a raw size count followed by that many elements
//! with no per-element tag.
//!
//! # Sections
//!
//! ```text
//! count                      raw size
//! repeated count times:
//!   key length               1 byte, 1..=255
//!   key                      raw bytes
//!   type tag                 1 byte
//!   value                    payload for the tag
//! ```
//!
//! # Empty Arrays
//!
//! An empty array has no element to infer a type from, so it is always written
//! as `0x88 0x00` (uint8 array, zero elements). Readers accept a zero-length
//! array under any base tag.

/// The eight signature bytes every stream starts with.
pub const SIGNATURE: [u8; 8] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01];

/// The only format version this codec reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the signature plus version byte.
pub const HEADER_LEN: usize = SIGNATURE.len() + 1;

/// Bit set on a type tag to mark an array of the base kind.
pub const ARRAY_FLAG: u8 = 0x80;

/// Largest key length a section entry can carry.
pub const MAX_KEY_LEN: usize = u8::MAX as usize;

/// Largest value representable as a raw size.
pub const MAX_RAW_SIZE: u64 = (1 << 62) - 1;

/// Base kind of a value on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Int64 = 1,
    Int32 = 2,
    Int16 = 3,
    Int8 = 4,
    Uint64 = 5,
    Uint32 = 6,
    Uint16 = 7,
    Uint8 = 8,
    Double = 9,
    String = 10,
    Bool = 11,
    Section = 12,
}

impl TypeTag {
    /// Parses a base tag (array flag already stripped).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::format::TypeTag;
    ///
    /// assert_eq!(TypeTag::from_u8(8), Some(TypeTag::Uint8));
    /// assert_eq!(TypeTag::from_u8(13), None);
    /// ```
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => TypeTag::Int64,
            2 => TypeTag::Int32,
            3 => TypeTag::Int16,
            4 => TypeTag::Int8,
            5 => TypeTag::Uint64,
            6 => TypeTag::Uint32,
            7 => TypeTag::Uint16,
            8 => TypeTag::Uint8,
            9 => TypeTag::Double,
            10 => TypeTag::String,
            11 => TypeTag::Bool,
            12 => TypeTag::Section,
            _ => return None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// The tag byte announcing an array of this kind.
    #[inline]
    #[must_use]
    pub const fn array(self) -> u8 {
        self as u8 | ARRAY_FLAG
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Int64 => "int64",
            TypeTag::Int32 => "int32",
            TypeTag::Int16 => "int16",
            TypeTag::Int8 => "int8",
            TypeTag::Uint64 => "uint64",
            TypeTag::Uint32 => "uint32",
            TypeTag::Uint16 => "uint16",
            TypeTag::Uint8 => "uint8",
            TypeTag::Double => "double",
            TypeTag::String => "string",
            TypeTag::Bool => "bool",
            TypeTag::Section => "section",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_bytes() {
        for byte in 1..=12u8 {
            let tag = TypeTag::from_u8(byte).unwrap();
            assert_eq!(tag.as_u8(), byte);
        }
        assert_eq!(TypeTag::from_u8(0), None);
        assert_eq!(TypeTag::Uint8.array(), 0x88);
        assert_eq!(TypeTag::Uint16.array(), 0x87);
        assert_eq!(TypeTag::Section.array(), 0x8c);
    }

    #[test]
    fn test_header_len() {
        assert_eq!(HEADER_LEN, 9);
    }
}
