//! Dynamic value representation for portable storage data.
//!
//! This module provides the [`Value`] enum, which can hold anything a
//! portable storage stream can carry, and the integer machinery behind it.
//!
//! ## Core Types
//!
//! - [`Value`]: integer, double, string, bool, section or array
//! - [`Integer`]: an integer payload, optionally pinned to one wire type
//! - [`IntType`]: the eight fixed-width integer kinds of the format
//!
//! ## Integer Widths
//!
//! An [`Integer`] built with [`Integer::auto`] has no wire type of its own;
//! the encoder picks the smallest sufficient one with [`auto_width`]. An
//! integer built with [`Integer::typed`] is always written with exactly that
//! type. Decoded integers are pinned to the type they were read as, so a
//! decoded tree re-encodes to the same bytes.
//!
//! Integer equality compares numeric values only:
//!
//! ```rust
//! use portable_storage::{Integer, IntType, Value};
//!
//! let pinned = Value::Integer(Integer::typed(7, IntType::Uint64).unwrap());
//! assert_eq!(pinned, Value::from(7));
//! ```
//!
//! ## Creating Values
//!
//! ```rust
//! use portable_storage::{storage, Value};
//!
//! let number = Value::from(42);
//! let text = Value::from("hello");
//! let blob = Value::from(vec![0u8, 159, 146, 150]);
//!
//! let section = storage!({
//!     "height": 1024,
//!     "hashes": ["aa", "bb"]
//! });
//! assert!(section.is_section());
//! ```

use crate::format::TypeTag;
use crate::{Error, Result, Section};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The fixed-width integer kinds of the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntType {
    Int64,
    Int32,
    Int16,
    Int8,
    Uint64,
    Uint32,
    Uint16,
    Uint8,
}

impl IntType {
    /// Looks up the kind for a signedness and byte width.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::IntType;
    ///
    /// assert_eq!(IntType::new(true, 2), Some(IntType::Int16));
    /// assert_eq!(IntType::new(false, 3), None);
    /// ```
    #[must_use]
    pub const fn new(signed: bool, width: usize) -> Option<Self> {
        Some(match (signed, width) {
            (true, 8) => IntType::Int64,
            (true, 4) => IntType::Int32,
            (true, 2) => IntType::Int16,
            (true, 1) => IntType::Int8,
            (false, 8) => IntType::Uint64,
            (false, 4) => IntType::Uint32,
            (false, 2) => IntType::Uint16,
            (false, 1) => IntType::Uint8,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn from_tag(tag: TypeTag) -> Option<Self> {
        Some(match tag {
            TypeTag::Int64 => IntType::Int64,
            TypeTag::Int32 => IntType::Int32,
            TypeTag::Int16 => IntType::Int16,
            TypeTag::Int8 => IntType::Int8,
            TypeTag::Uint64 => IntType::Uint64,
            TypeTag::Uint32 => IntType::Uint32,
            TypeTag::Uint16 => IntType::Uint16,
            TypeTag::Uint8 => IntType::Uint8,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn tag(self) -> TypeTag {
        match self {
            IntType::Int64 => TypeTag::Int64,
            IntType::Int32 => TypeTag::Int32,
            IntType::Int16 => TypeTag::Int16,
            IntType::Int8 => TypeTag::Int8,
            IntType::Uint64 => TypeTag::Uint64,
            IntType::Uint32 => TypeTag::Uint32,
            IntType::Uint16 => TypeTag::Uint16,
            IntType::Uint8 => TypeTag::Uint8,
        }
    }

    /// Payload width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            IntType::Int64 | IntType::Uint64 => 8,
            IntType::Int32 | IntType::Uint32 => 4,
            IntType::Int16 | IntType::Uint16 => 2,
            IntType::Int8 | IntType::Uint8 => 1,
        }
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            IntType::Int64 | IntType::Int32 | IntType::Int16 | IntType::Int8
        )
    }

    #[must_use]
    pub const fn min(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (8 * self.width() - 1))
        } else {
            0
        }
    }

    #[must_use]
    pub const fn max(self) -> i128 {
        if self.is_signed() {
            (1i128 << (8 * self.width() - 1)) - 1
        } else {
            (1i128 << (8 * self.width())) - 1
        }
    }

    /// Returns `true` if `value` is representable in this kind.
    #[inline]
    #[must_use]
    pub const fn contains(self, value: i128) -> bool {
        value >= self.min() && value <= self.max()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.tag().name()
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks the signedness and byte width for a freestanding integer.
///
/// Negative values are measured as `-2 * value`, which makes them fit one
/// bit tighter than the two's-complement range (`-128` needs two bytes).
/// The search stops at four bytes; 64-bit types are only ever used when
/// requested explicitly.
///
/// # Examples
///
/// ```rust
/// use portable_storage::value::auto_width;
///
/// assert_eq!(auto_width(255), (false, 1));
/// assert_eq!(auto_width(256), (false, 2));
/// assert_eq!(auto_width(-1), (true, 1));
/// assert_eq!(auto_width(-128), (true, 2));
/// assert_eq!(auto_width(1 << 40), (false, 4));
/// ```
#[must_use]
pub fn auto_width(value: i128) -> (bool, usize) {
    let signed = value < 0;
    let magnitude = if signed {
        value.saturating_mul(-2)
    } else {
        value
    };

    let mut width = 1usize;
    while width < 4 && magnitude > (1i128 << (8 * width)) - 1 {
        width *= 2;
    }
    (signed, width)
}

/// [`auto_width`] as an [`IntType`].
#[must_use]
pub fn auto_type(value: i128) -> IntType {
    match auto_width(value) {
        (true, 1) => IntType::Int8,
        (true, 2) => IntType::Int16,
        (true, _) => IntType::Int32,
        (false, 1) => IntType::Uint8,
        (false, 2) => IntType::Uint16,
        (false, _) => IntType::Uint32,
    }
}

/// An integer payload with an optional pinned wire type.
///
/// The payload is held as `i128` so that the full `int64` and `uint64`
/// ranges fit side by side.
#[derive(Clone, Copy, Debug)]
pub struct Integer {
    value: i128,
    ty: Option<IntType>,
}

impl Integer {
    /// An integer whose wire type is chosen by [`auto_width`] when encoded.
    #[must_use]
    pub fn auto(value: impl Into<i128>) -> Self {
        Integer {
            value: value.into(),
            ty: None,
        }
    }

    /// An integer pinned to `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfRange`] if `value` does not fit `ty`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::{Integer, IntType};
    ///
    /// assert!(Integer::typed(255, IntType::Uint8).is_ok());
    /// assert!(Integer::typed(256, IntType::Uint8).is_err());
    /// assert!(Integer::typed(-1, IntType::Uint64).is_err());
    /// ```
    pub fn typed(value: impl Into<i128>, ty: IntType) -> Result<Self> {
        let value = value.into();
        if !ty.contains(value) {
            return Err(Error::ValueOutOfRange {
                value,
                ty: ty.name(),
            });
        }
        Ok(Integer {
            value,
            ty: Some(ty),
        })
    }

    /// Auto-width when the auto-width search can hold `value`, otherwise the
    /// smallest 64-bit type that can.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfRange`] outside `i64::MIN..=u64::MAX`.
    pub fn compact(value: impl Into<i128>) -> Result<Self> {
        let value = value.into();
        if auto_type(value).contains(value) {
            Ok(Integer::auto(value))
        } else if IntType::Int64.contains(value) && value < 0 {
            Integer::typed(value, IntType::Int64)
        } else {
            Integer::typed(value, IntType::Uint64)
        }
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> i128 {
        self.value
    }

    /// The pinned type, if any.
    #[inline]
    #[must_use]
    pub const fn pinned_type(&self) -> Option<IntType> {
        self.ty
    }

    /// The type this integer is written with outside of an array.
    #[must_use]
    pub fn wire_type(&self) -> IntType {
        self.ty.unwrap_or_else(|| auto_type(self.value))
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        i64::try_from(self.value).ok()
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        u64::try_from(self.value).ok()
    }
}

impl PartialEq for Integer {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Integer {}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A dynamically-typed portable storage value.
///
/// # Examples
///
/// ```rust
/// use portable_storage::{Section, Value};
///
/// let mut section = Section::new();
/// section.insert("status".to_string(), Value::from("OK"));
/// section.insert("count".to_string(), Value::from(3));
///
/// let value = Value::Section(section);
/// assert!(value.is_section());
/// assert_eq!(value.get("status").and_then(Value::as_str), Some("OK"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(Integer),
    /// Recognized by the format but never encoded or decoded.
    Double(f64),
    /// Raw bytes; the format does not require UTF-8.
    String(Vec<u8>),
    Bool(bool),
    Section(Section),
    Array(Vec<Value>),
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_section(&self) -> bool {
        matches!(self, Value::Section(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Section(_) => "section",
            Value::Array(_) => "array",
        }
    }

    #[inline]
    #[must_use]
    pub fn as_integer(&self) -> Option<&Integer> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// If the value is an integer within `i64`, returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::Value;
    ///
    /// assert_eq!(Value::from(-5).as_i64(), Some(-5));
    /// assert_eq!(Value::from(u64::MAX).as_i64(), None);
    /// assert_eq!(Value::from(true).as_i64(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(Integer::as_i64)
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(Integer::as_u64)
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns its raw bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a UTF-8 string, returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use portable_storage::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(vec![0xffu8]).as_str(), None);
    /// ```
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Value::Section(section) => Some(section),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a section.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_section().and_then(|section| section.get(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Section(section) => {
                f.write_str("{")?;
                for (i, (key, value)) in section.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{:?}:{}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Array(arr) => {
                write!(
                    f,
                    "[{}]",
                    arr.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Integer(i) => {
                let v = i.value();
                // Pinned integers were range checked on construction.
                match i.pinned_type() {
                    Some(IntType::Int64) => serializer.serialize_i64(v as i64),
                    Some(IntType::Int32) => serializer.serialize_i32(v as i32),
                    Some(IntType::Int16) => serializer.serialize_i16(v as i16),
                    Some(IntType::Int8) => serializer.serialize_i8(v as i8),
                    Some(IntType::Uint64) => serializer.serialize_u64(v as u64),
                    Some(IntType::Uint32) => serializer.serialize_u32(v as u32),
                    Some(IntType::Uint16) => serializer.serialize_u16(v as u16),
                    Some(IntType::Uint8) => serializer.serialize_u8(v as u8),
                    None => serializer.serialize_i128(v),
                }
            }
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => serializer.serialize_bytes(bytes),
            },
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Section(section) => section.serialize(serializer),
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        fn typed<E: de::Error>(v: impl Into<i128>, ty: IntType) -> std::result::Result<Value, E> {
            Integer::typed(v, ty)
                .map(Value::Integer)
                .map_err(de::Error::custom)
        }

        fn compact<E: de::Error>(v: impl Into<i128>) -> std::result::Result<Value, E> {
            Integer::compact(v)
                .map(Value::Integer)
                .map_err(de::Error::custom)
        }

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any portable storage value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i8<E: de::Error>(self, value: i8) -> std::result::Result<Value, E> {
                typed(value, IntType::Int8)
            }

            fn visit_i16<E: de::Error>(self, value: i16) -> std::result::Result<Value, E> {
                typed(value, IntType::Int16)
            }

            fn visit_i32<E: de::Error>(self, value: i32) -> std::result::Result<Value, E> {
                typed(value, IntType::Int32)
            }

            fn visit_u8<E: de::Error>(self, value: u8) -> std::result::Result<Value, E> {
                typed(value, IntType::Uint8)
            }

            fn visit_u16<E: de::Error>(self, value: u16) -> std::result::Result<Value, E> {
                typed(value, IntType::Uint16)
            }

            fn visit_u32<E: de::Error>(self, value: u32) -> std::result::Result<Value, E> {
                typed(value, IntType::Uint32)
            }

            // Self-describing formats report every integer as 64 bits wide.
            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Value, E> {
                compact(value)
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Value, E> {
                compact(value)
            }

            fn visit_i128<E: de::Error>(self, value: i128) -> std::result::Result<Value, E> {
                compact(value)
            }

            fn visit_u128<E: de::Error>(self, value: u128) -> std::result::Result<Value, E> {
                let value = i128::try_from(value).map_err(de::Error::custom)?;
                compact(value)
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Double(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                Ok(Value::String(value.as_bytes().to_vec()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::String(value.into_bytes()))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E> {
                Ok(Value::String(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::String(value))
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut section = Section::new();
                while let Some((key, value)) = map.next_entry()? {
                    section.insert(key, value);
                }
                Ok(Value::Section(section))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::custom(format!("expected i64, found {}", value.kind_name())))
    }
}

impl TryFrom<Value> for u64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_u64()
            .ok_or_else(|| Error::custom(format!("expected u64, found {}", value.kind_name())))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            _ => Err(Error::custom(format!(
                "expected bool, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(bytes) => String::from_utf8(bytes).map_err(Error::custom),
            _ => Err(Error::custom(format!(
                "expected string, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(bytes) => Ok(bytes),
            _ => Err(Error::custom(format!(
                "expected string, found {}",
                value.kind_name()
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_integer {
    ($($ty:ty)*) => {
        $(
            /// Builds an unpinned integer. As a section entry it must fit in
            /// 32 bits; wrap wider values with [`Integer::typed`] or
            /// [`Integer::compact`] first.
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(Integer::auto(value))
                }
            }
        )*
    };
}

from_integer!(i8 i16 i32 i64 u8 u16 u32 u64);

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into_bytes())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::String(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::String(value.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Section> for Value {
    fn from(value: Section) -> Self {
        Value::Section(value)
    }
}
