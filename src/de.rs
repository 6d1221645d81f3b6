//! Portable storage decoding.
//!
//! This module provides the [`Deserializer`], which reads a complete stream
//! into a [`Value`] tree and hands it to serde.
//!
//! ## Overview
//!
//! - **Single pass**: the stream is read front to back with no backtracking
//! - **Self-describing**: every section entry carries its own type tag
//! - **All or nothing**: a decode either yields the whole tree or an error
//! - **Bounded**: nesting depth is limited and declared counts are checked
//!   against the bytes left before anything is allocated
//!
//! ## Usage
//!
//! ```rust
//! use portable_storage::from_slice;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Data { a: u8 }
//!
//! let bytes = [
//!     0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01,
//!     0x04, 0x01, b'a', 0x08, 0x01,
//! ];
//! let data: Data = from_slice(&bytes).unwrap();
//! assert_eq!(data, Data { a: 1 });
//! ```

use crate::format::{TypeTag, ARRAY_FLAG, FORMAT_VERSION, SIGNATURE};
use crate::options::DuplicateKeys;
use crate::value::IntType;
use crate::{raw_size, Error, Integer, Result, Section, StorageOptions, Value};
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;
use tracing::{debug, trace};

/// Smallest possible section entry: key length, one key byte, tag, one payload byte.
const MIN_ENTRY_LEN: usize = 4;

/// The portable storage decoder.
///
/// Reads from a borrowed byte slice. Created via [`Deserializer::from_slice`]
/// or [`Deserializer::with_options`].
pub struct Deserializer<'de> {
    input: &'de [u8],
    position: usize,
    depth: usize,
    options: StorageOptions,
}

impl<'de> Deserializer<'de> {
    pub fn from_slice(input: &'de [u8]) -> Self {
        Self::with_options(input, StorageOptions::default())
    }

    pub fn with_options(input: &'de [u8], options: StorageOptions) -> Self {
        Deserializer {
            input,
            position: 0,
            depth: 0,
            options,
        }
    }

    /// Offset of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'de [u8]> {
        if n > self.remaining() {
            return Err(Error::truncated(self.position, n, self.remaining()));
        }
        let bytes = &self.input[self.position..self.position + n];
        self.position += n;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads and checks the signature and version.
    pub fn read_header(&mut self) -> Result<()> {
        let signature = self.read_bytes(SIGNATURE.len())?;
        if signature != SIGNATURE {
            let mut found = [0u8; 8];
            found.copy_from_slice(signature);
            debug!(?found, "rejecting stream with bad signature");
            return Err(Error::BadSignature { found });
        }

        let version = self.read_u8()?;
        if version != FORMAT_VERSION {
            debug!(version, "rejecting stream with unsupported version");
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(())
    }

    /// Reads a whole stream: header, root section, and nothing after it
    /// unless trailing bytes are allowed.
    pub fn read_stream(&mut self) -> Result<Section> {
        self.read_header()?;
        let root = self.read_section()?;
        if !self.options.allow_trailing_bytes {
            self.end()?;
        }
        trace!(
            len = self.position,
            entries = root.len(),
            "decoded portable storage stream"
        );
        Ok(root)
    }

    /// Fails if any input is left unread.
    pub fn end(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(Error::TrailingBytes(n)),
        }
    }

    pub fn read_raw_size(&mut self) -> Result<u64> {
        let start = self.position;
        let (n, len) = raw_size::read_raw_size(&self.input[start..]).map_err(|e| match e {
            Error::Truncated {
                offset,
                need,
                remaining,
            } => Error::truncated(start + offset, need, remaining),
            other => other,
        })?;
        self.position += len;
        Ok(n)
    }

    /// Reads a count of items each at least `min_len` bytes long, failing
    /// early when the rest of the input cannot hold them.
    fn read_count(&mut self, min_len: usize) -> Result<usize> {
        let offset = self.position;
        let count = self.read_raw_size()?;
        let need = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(min_len))
            .unwrap_or(usize::MAX);
        if need > self.remaining() {
            return Err(Error::truncated(offset, need, self.remaining()));
        }
        Ok(count as usize)
    }

    /// Reads an untagged `ty` integer payload.
    pub fn read_int(&mut self, ty: IntType) -> Result<Integer> {
        let width = ty.width();
        let bytes = self.read_bytes(width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(bytes);

        let raw = i128::from(u64::from_le_bytes(buf));
        let value = if ty.is_signed() && raw > ty.max() {
            raw - (1i128 << (8 * width))
        } else {
            raw
        };
        Integer::typed(value, ty)
    }

    /// Reads an untagged bool payload; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads an untagged, size-prefixed string payload.
    pub fn read_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_count(1)?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn read_key(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        if len == 0 {
            return Err(Error::InvalidKeyLength(0));
        }
        let offset = self.position;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| Error::InvalidKey { offset })
    }

    /// Reads a type tag followed by the value it announces.
    pub fn read_value(&mut self) -> Result<Value> {
        let offset = self.position;
        let tag = self.read_u8()?;
        if tag & ARRAY_FLAG != 0 {
            return self.read_array(tag & !ARRAY_FLAG).map(Value::Array);
        }
        let tag = TypeTag::from_u8(tag).ok_or(Error::UnknownTypeTag { tag, offset })?;
        self.read_payload(tag)
    }

    /// Reads one untagged payload of kind `tag`.
    fn read_payload(&mut self, tag: TypeTag) -> Result<Value> {
        if let Some(ty) = IntType::from_tag(tag) {
            return self.read_int(ty).map(Value::Integer);
        }
        match tag {
            TypeTag::String => self.read_string().map(Value::String),
            TypeTag::Bool => self.read_bool().map(Value::Bool),
            TypeTag::Section => self.read_section().map(Value::Section),
            _ => Err(Error::unsupported_type(tag.name())),
        }
    }

    /// Reads an untagged section: entry count, then key and tagged value per entry.
    pub fn read_section(&mut self) -> Result<Section> {
        self.enter()?;
        let count = self.read_count(MIN_ENTRY_LEN)?;
        let mut section = Section::with_capacity(count);

        for _ in 0..count {
            let key = self.read_key()?;
            let value = self.read_value()?;
            if section.contains_key(&key) {
                match self.options.duplicate_keys {
                    DuplicateKeys::LastWins => {}
                    DuplicateKeys::FirstWins => continue,
                    DuplicateKeys::Reject => {
                        debug!(%key, "rejecting section with duplicate key");
                        return Err(Error::DuplicateKey(key));
                    }
                }
            }
            section.insert(key, value);
        }

        self.depth -= 1;
        Ok(section)
    }

    /// Reads the count and elements of an array whose base tag is `base`.
    ///
    /// A zero-length array is accepted whatever `base` says.
    pub fn read_array(&mut self, base: u8) -> Result<Vec<Value>> {
        self.enter()?;
        let offset = self.position;
        let count = self.read_raw_size()?;
        if count == 0 {
            self.depth -= 1;
            return Ok(Vec::new());
        }
        self.position = offset;

        let tag = TypeTag::from_u8(base).ok_or(Error::UnknownTypeTag {
            tag: base | ARRAY_FLAG,
            offset: offset - 1,
        })?;
        let min_len = IntType::from_tag(tag).map_or(1, IntType::width);
        let count = self.read_count(min_len)?;

        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.read_payload(tag)?);
        }

        self.depth -= 1;
        Ok(elements)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            debug!(limit = self.options.max_depth, "nesting depth limit exceeded");
            return Err(Error::DepthLimitExceeded(self.options.max_depth));
        }
        Ok(())
    }
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let root = self.read_stream()?;
        visitor.visit_map(MapDeserializer::new(root))
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let root = self.read_stream()?;
        de::Deserializer::deserialize_enum(
            ValueDeserializer::new(Value::Section(root)),
            name,
            variants,
            visitor,
        )
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

/// Deserializes a `T` from a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use portable_storage::{from_value, storage};
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// struct Peer { host: String, port: u16 }
///
/// let peer: Peer = from_value(storage!({ "host": "node.local", "port": 18080 })).unwrap();
/// assert_eq!(peer, Peer { host: "node.local".to_string(), port: 18080 });
/// ```
///
/// # Errors
///
/// Returns an error if the tree does not have the shape `T` expects.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: de::DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(section: Section) -> Self {
        MapDeserializer {
            iter: section.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(KeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

/// Section keys are always strings on the wire; integer map keys are written
/// in decimal and parsed back here.
struct KeyDeserializer {
    key: String,
}

macro_rules! deserialize_numeric_key {
    ($($method:ident => $visit:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.key.parse::<$ty>() {
                    Ok(n) => visitor.$visit(n),
                    Err(_) => Err(Error::custom(format!(
                        "invalid {} section key: {:?}",
                        stringify!($ty),
                        self.key
                    ))),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_string(self.key)
    }

    deserialize_numeric_key! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_i128 => visit_i128: i128,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_u128 => visit_u128: u128,
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let key: de::value::StringDeserializer<Error> = self.key.into_deserializer();
        de::Deserializer::deserialize_enum(key, name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct EnumDeserializer {
    variant: String,
    value: Option<Value>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Option<Value>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            None => Ok(()),
            Some(_) => Err(Error::custom("Expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.value {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("Expected newtype variant")),
        }
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Array(arr)) => visitor.visit_seq(SeqDeserializer::new(arr)),
            _ => Err(Error::custom("Expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Some(Value::Section(section)) => visitor.visit_map(MapDeserializer::new(section)),
            _ => Err(Error::custom("Expected struct variant")),
        }
    }
}

struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

fn visit_integer<'de, V>(int: Integer, visitor: V) -> Result<V::Value>
where
    V: de::Visitor<'de>,
{
    let v = int.value();
    match int.pinned_type() {
        Some(IntType::Int64) => visitor.visit_i64(v as i64),
        Some(IntType::Int32) => visitor.visit_i32(v as i32),
        Some(IntType::Int16) => visitor.visit_i16(v as i16),
        Some(IntType::Int8) => visitor.visit_i8(v as i8),
        Some(IntType::Uint64) => visitor.visit_u64(v as u64),
        Some(IntType::Uint32) => visitor.visit_u32(v as u32),
        Some(IntType::Uint16) => visitor.visit_u16(v as u16),
        Some(IntType::Uint8) => visitor.visit_u8(v as u8),
        None => match (int.as_i64(), int.as_u64()) {
            (_, Some(u)) => visitor.visit_u64(u),
            (Some(i), None) => visitor.visit_i64(i),
            (None, None) => visitor.visit_i128(v),
        },
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Integer(int) => visit_integer(int, visitor),
            Value::Double(d) => visitor.visit_f64(d),
            Value::String(bytes) => match String::from_utf8(bytes) {
                Ok(s) => visitor.visit_string(s),
                Err(e) => visitor.visit_byte_buf(e.into_bytes()),
            },
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Section(section) => visitor.visit_map(MapDeserializer::new(section)),
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(bytes) => visitor.visit_byte_buf(bytes),
            other => de::Deserializer::deserialize_any(ValueDeserializer::new(other), visitor),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            // A blob read into a byte sequence.
            Value::String(bytes) => visitor.visit_seq(SeqDeserializer::new(
                bytes.into_iter().map(Value::from).collect(),
            )),
            other => Err(Error::custom(format!(
                "Expected array, found {}",
                other.kind_name()
            ))),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(bytes) => {
                let variant = String::from_utf8(bytes)
                    .map_err(|_| Error::custom("Enum variant is not valid UTF-8"))?;
                visitor.visit_enum(variant.into_deserializer())
            }
            Value::Section(section) if section.len() == 1 => {
                let mut entries = section.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer {
                        variant,
                        value: Some(value),
                    }),
                    None => Err(Error::custom("Expected enum variant")),
                }
            }
            _ => Err(Error::custom("Expected enum")),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 9] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];

    fn stream(body: &[u8]) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<Section> {
        Deserializer::from_slice(bytes).read_stream()
    }

    #[test]
    fn test_read_signed_ints() {
        let mut de = Deserializer::from_slice(&[0xff, 0xfe, 0xff, 0x00, 0x80]);
        assert_eq!(de.read_int(IntType::Int8).unwrap().value(), -1);
        assert_eq!(de.read_int(IntType::Int16).unwrap().value(), -2);
        assert_eq!(de.read_int(IntType::Int16).unwrap().value(), -32768);

        let mut de = Deserializer::from_slice(&[0xff; 8]);
        assert_eq!(de.read_int(IntType::Uint64).unwrap().value(), u64::MAX as i128);
    }

    #[test]
    fn test_decoded_ints_are_pinned() {
        let root = decode(&stream(&[0x04, 0x01, b'a', 0x05, 1, 0, 0, 0, 0, 0, 0, 0])).unwrap();
        let int = root.get("a").and_then(Value::as_integer).unwrap();
        assert_eq!(int.pinned_type(), Some(IntType::Uint64));
        assert_eq!(int.value(), 1);
    }

    #[test]
    fn test_bool_nonzero_is_true() {
        let root = decode(&stream(&[0x04, 0x01, b'b', 0x0b, 0x07])).unwrap();
        assert_eq!(root.get("b"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_empty_array_any_tag() {
        for tag in [0x81u8, 0x8a, 0x8c, 0x89, 0xff] {
            let root = decode(&stream(&[0x04, 0x01, b'x', tag, 0x00])).unwrap();
            assert_eq!(root.get("x"), Some(&Value::Array(vec![])));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            decode(&stream(&[0x04, 0x01, b'x', 0x0d, 0x00])),
            Err(Error::UnknownTypeTag {
                tag: 0x0d,
                offset: 12
            })
        );
        assert_eq!(
            decode(&stream(&[0x04, 0x01, b'x', 0x8d, 0x04, 0x00])),
            Err(Error::UnknownTypeTag {
                tag: 0x8d,
                offset: 12
            })
        );
    }

    #[test]
    fn test_double_rejected() {
        let result = decode(&stream(&[0x04, 0x01, b'd', 0x09, 0, 0, 0, 0, 0, 0, 0xf0, 0x3f]));
        assert!(matches!(result, Err(Error::UnsupportedType(_))));

        let result = decode(&stream(&[0x04, 0x01, b'd', 0x89, 0x04, 0, 0, 0, 0, 0, 0, 0xf0, 0x3f]));
        assert!(matches!(result, Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn test_zero_length_key() {
        assert_eq!(
            decode(&stream(&[0x04, 0x00, 0x08, 0x01])),
            Err(Error::InvalidKeyLength(0))
        );
    }

    #[test]
    fn test_bad_header() {
        let mut bytes = stream(&[0x00]);
        bytes[0] = 0x02;
        assert!(matches!(decode(&bytes), Err(Error::BadSignature { .. })));

        let mut bytes = stream(&[0x00]);
        bytes[8] = 0x02;
        assert_eq!(decode(&bytes), Err(Error::UnsupportedVersion(2)));

        assert_eq!(decode(&HEADER[..5]), Err(Error::truncated(0, 8, 5)));
    }

    #[test]
    fn test_truncated_mid_raw_size() {
        // count marker 1 promises a second byte
        assert_eq!(decode(&stream(&[0x05])), Err(Error::truncated(9, 2, 1)));
    }

    #[test]
    fn test_truncated_payload() {
        let result = decode(&stream(&[0x04, 0x01, b'a', 0x06, 0x01, 0x00]));
        assert_eq!(result, Err(Error::truncated(13, 4, 2)));
    }

    #[test]
    fn test_oversized_count_fails_before_allocating() {
        let result = decode(&stream(&[0xfe, 0xff, 0xff, 0xff]));
        assert!(matches!(result, Err(Error::Truncated { .. })));

        let result = decode(&stream(&[0x04, 0x01, b'a', 0x85, 0x10, 0x00]));
        assert_eq!(result, Err(Error::truncated(13, 32, 1)));
    }

    #[test]
    fn test_trailing_bytes() {
        assert_eq!(decode(&stream(&[0x00, 0xaa])), Err(Error::TrailingBytes(1)));

        let options = StorageOptions::new().with_trailing_bytes(true);
        let bytes = stream(&[0x00, 0xaa]);
        let root = Deserializer::with_options(&bytes, options).read_stream();
        assert_eq!(root, Ok(Section::new()));
    }

    #[test]
    fn test_duplicate_key_policies() {
        let bytes = stream(&[
            0x0c, // three entries
            0x01, b'a', 0x08, 0x01, //
            0x01, b'b', 0x08, 0x02, //
            0x01, b'a', 0x08, 0x03,
        ]);

        let last = Deserializer::from_slice(&bytes).read_stream().unwrap();
        assert_eq!(last.get("a"), Some(&Value::from(3)));
        assert_eq!(last.keys().collect::<Vec<_>>(), ["a", "b"]);

        let options = StorageOptions::new().with_duplicate_keys(DuplicateKeys::FirstWins);
        let first = Deserializer::with_options(&bytes, options)
            .read_stream()
            .unwrap();
        assert_eq!(first.get("a"), Some(&Value::from(1)));

        let options = StorageOptions::new().with_duplicate_keys(DuplicateKeys::Reject);
        assert_eq!(
            Deserializer::with_options(&bytes, options).read_stream(),
            Err(Error::DuplicateKey("a".to_string()))
        );
    }

    #[test]
    fn test_depth_limit() {
        // root -> "n" section -> "n" section (empty)
        let bytes = stream(&[
            0x04, 0x01, b'n', 0x0c, //
            0x04, 0x01, b'n', 0x0c, 0x00,
        ]);
        let options = StorageOptions::new().with_max_depth(3);
        assert!(Deserializer::with_options(&bytes, options).read_stream().is_ok());

        let options = StorageOptions::new().with_max_depth(2);
        assert_eq!(
            Deserializer::with_options(&bytes, options).read_stream(),
            Err(Error::DepthLimitExceeded(2))
        );
    }

    #[test]
    fn test_non_utf8_key() {
        let result = decode(&stream(&[0x04, 0x01, 0xff, 0x08, 0x01]));
        assert_eq!(result, Err(Error::InvalidKey { offset: 11 }));
    }
}
