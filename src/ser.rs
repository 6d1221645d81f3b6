//! Portable storage encoding.
//!
//! This module provides the [`Serializer`], which writes a [`Value`] tree as
//! portable storage bytes, and the serde glue that lowers any
//! `T: Serialize` into such a tree.
//!
//! ## Overview
//!
//! Encoding is a single depth-first walk:
//!
//! - **Framing**: signature and version, written once per stream
//! - **Sections**: entry count, then key and tagged value per entry
//! - **Arrays**: one type tag for the whole array, then untagged elements
//! - **Integers**: auto-width unless pinned to a type, always range checked
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use portable_storage::to_vec;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Request { height: u64, txs_as_hex: Vec<String> }
//!
//! let bytes = to_vec(&Request { height: 10, txs_as_hex: vec![] }).unwrap();
//! assert_eq!(&bytes[..9], &[0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01]);
//! ```
//!
//! ## Direct Serializer Usage
//!
//! ```rust
//! use portable_storage::{Serializer, StorageOptions, Value};
//!
//! let mut serializer = Serializer::new(StorageOptions::new());
//! serializer
//!     .write_array(&[Value::from(1), Value::from(300)])
//!     .unwrap();
//! assert_eq!(serializer.into_inner(), [0x87, 0x08, 0x01, 0x00, 0x2c, 0x01]);
//! ```

use crate::format::{TypeTag, FORMAT_VERSION, MAX_KEY_LEN, SIGNATURE};
use crate::value::IntType;
use crate::{raw_size, Error, Integer, Result, Section, StorageOptions, Value};
use serde::{ser, Serialize};
use tracing::{debug, trace};

/// The portable storage encoder.
///
/// Writes into an owned buffer. A failed write leaves the buffer in an
/// unspecified state; callers discard it.
pub struct Serializer {
    output: Vec<u8>,
    options: StorageOptions,
    depth: usize,
}

impl Serializer {
    pub fn new(options: StorageOptions) -> Self {
        Serializer {
            output: Vec::with_capacity(256),
            options,
            depth: 0,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.output
    }

    /// Writes the header followed by `root` without a leading type tag.
    pub fn write_stream(&mut self, root: &Section) -> Result<()> {
        self.output.extend_from_slice(&SIGNATURE);
        self.output.push(FORMAT_VERSION);
        self.write_section(root, false)?;
        trace!(
            len = self.output.len(),
            entries = root.len(),
            "encoded portable storage stream"
        );
        Ok(())
    }

    #[inline]
    pub fn write_raw_size(&mut self, n: u64) -> Result<()> {
        raw_size::write_raw_size(&mut self.output, n)
    }

    #[inline]
    fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_raw_size(len as u64)
    }

    /// Writes `value` as a `ty` integer, little-endian two's complement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfRange`] if `value` does not fit `ty`.
    pub fn write_int(&mut self, value: i128, ty: IntType, include_tag: bool) -> Result<()> {
        if !ty.contains(value) {
            return Err(Error::ValueOutOfRange {
                value,
                ty: ty.name(),
            });
        }
        if include_tag {
            self.output.push(ty.tag().as_u8());
        }
        self.output
            .extend_from_slice(&(value as u128).to_le_bytes()[..ty.width()]);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool, include_tag: bool) {
        if include_tag {
            self.output.push(TypeTag::Bool.as_u8());
        }
        self.output.push(u8::from(value));
    }

    pub fn write_string(&mut self, bytes: &[u8], include_tag: bool) -> Result<()> {
        if include_tag {
            self.output.push(TypeTag::String.as_u8());
        }
        self.write_len(bytes.len())?;
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn write_key(&mut self, key: &str) -> Result<()> {
        let len = key.len();
        if len == 0 || len > MAX_KEY_LEN {
            return Err(Error::InvalidKeyLength(len));
        }
        self.output.push(len as u8);
        self.output.extend_from_slice(key.as_bytes());
        Ok(())
    }

    /// Writes a value as a section entry would: type tag first.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Integer(i) => self.write_int(i.value(), i.wire_type(), true),
            Value::Double(_) => Err(Error::unsupported_type("double")),
            Value::String(bytes) => self.write_string(bytes, true),
            Value::Bool(b) => {
                self.write_bool(*b, true);
                Ok(())
            }
            Value::Section(section) => self.write_section(section, true),
            Value::Array(elements) => self.write_array(elements),
        }
    }

    pub fn write_section(&mut self, section: &Section, include_tag: bool) -> Result<()> {
        self.enter()?;
        if include_tag {
            self.output.push(TypeTag::Section.as_u8());
        }
        self.write_len(section.len())?;
        for (key, value) in section {
            self.write_key(key)?;
            self.write_value(value)?;
        }
        self.depth -= 1;
        Ok(())
    }

    /// Writes the array tag, the element count and the untagged elements.
    ///
    /// An empty array is always written as a `uint8` array.
    pub fn write_array(&mut self, elements: &[Value]) -> Result<()> {
        self.enter()?;
        match array_kind(elements)? {
            ArrayKind::Empty => {
                self.output.push(TypeTag::Uint8.array());
                self.write_raw_size(0)?;
            }
            ArrayKind::Integer(ty) => {
                self.output.push(ty.tag().array());
                self.write_len(elements.len())?;
                for element in elements {
                    if let Value::Integer(i) = element {
                        self.write_int(i.value(), ty, false)?;
                    }
                }
            }
            ArrayKind::String => {
                self.output.push(TypeTag::String.array());
                self.write_len(elements.len())?;
                for element in elements {
                    if let Value::String(bytes) = element {
                        self.write_string(bytes, false)?;
                    }
                }
            }
            ArrayKind::Bool => {
                self.output.push(TypeTag::Bool.array());
                self.write_len(elements.len())?;
                for element in elements {
                    if let Value::Bool(b) = element {
                        self.write_bool(*b, false);
                    }
                }
            }
            ArrayKind::Section => {
                self.output.push(TypeTag::Section.array());
                self.write_len(elements.len())?;
                for element in elements {
                    if let Value::Section(section) = element {
                        self.write_section(section, false)?;
                    }
                }
            }
        }
        self.depth -= 1;
        Ok(())
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

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArrayKind {
    Empty,
    Integer(IntType),
    String,
    Bool,
    Section,
}

/// Works out the single element type an array is written with.
///
/// Every element must be of the same kind as the first.
fn array_kind(elements: &[Value]) -> Result<ArrayKind> {
    let first = match elements.first() {
        Some(first) => first,
        None => return Ok(ArrayKind::Empty),
    };

    for element in elements {
        match element {
            Value::Array(_) => return Err(Error::NestedArray),
            Value::Double(_) => return Err(Error::unsupported_type("double")),
            _ if element.kind_name() != first.kind_name() => {
                return Err(Error::HeterogeneousArray {
                    expected: first.kind_name(),
                    found: element.kind_name(),
                })
            }
            _ => {}
        }
    }

    Ok(match first {
        Value::Integer(_) => ArrayKind::Integer(common_int_type(
            elements.iter().filter_map(Value::as_integer),
        )?),
        Value::String(_) => ArrayKind::String,
        Value::Bool(_) => ArrayKind::Bool,
        _ => ArrayKind::Section,
    })
}

/// Picks one integer type able to hold every element of an array.
///
/// Elements all pinned to the same type keep it. Otherwise each element
/// contributes its pinned or auto-width type; the result takes the widest
/// width and is signed if any contributor is. The width is then doubled
/// until the smallest and largest values fit.
fn common_int_type<'a>(ints: impl Iterator<Item = &'a Integer>) -> Result<IntType> {
    let mut shared_pin: Option<Option<IntType>> = None;
    let mut signed = false;
    let mut width = 1;
    let mut min = i128::MAX;
    let mut max = i128::MIN;

    for int in ints {
        let ty = int.wire_type();
        signed |= ty.is_signed();
        width = width.max(ty.width());
        min = min.min(int.value());
        max = max.max(int.value());

        shared_pin = match shared_pin {
            None => Some(int.pinned_type()),
            Some(pin) if pin == int.pinned_type() => Some(pin),
            Some(_) => Some(None),
        };
    }

    if let Some(Some(ty)) = shared_pin {
        return Ok(ty);
    }

    loop {
        let ty = IntType::new(signed, width)
            .ok_or_else(|| Error::custom(format!("no integer type of width {}", width)))?;
        if ty.contains(min) && ty.contains(max) {
            return Ok(ty);
        }
        if width == 8 {
            let value = if ty.contains(min) { max } else { min };
            return Err(Error::ValueOutOfRange {
                value,
                ty: ty.name(),
            });
        }
        width *= 2;
    }
}

/// Lowers serde data into a [`Value`] tree.
///
/// `None` lowers to "absent" so that optional struct fields and map values
/// are left out of their section; anywhere else it is an error.
#[derive(Clone, Copy)]
pub(crate) struct ValueSerializer {
    compact_integers: bool,
}

impl ValueSerializer {
    pub(crate) fn new(options: &StorageOptions) -> Self {
        ValueSerializer {
            compact_integers: options.compact_integers,
        }
    }

    fn int(self, value: impl Into<i128>, ty: IntType) -> Result<Option<Value>> {
        let int = if self.compact_integers {
            Integer::compact(value)?
        } else {
            Integer::typed(value, ty)?
        };
        Ok(Some(Value::Integer(int)))
    }

    fn present<T: Serialize + ?Sized>(self, value: &T) -> Result<Value> {
        value
            .serialize(self)?
            .ok_or_else(|| Error::unsupported_type("none outside of a section entry"))
    }
}

/// Serializes `value` into a [`Value`] tree.
pub(crate) fn to_value_with<T: Serialize + ?Sized>(
    value: &T,
    options: &StorageOptions,
) -> Result<Value> {
    ValueSerializer::new(options).present(value)
}

fn variant_section(variant: &'static str, value: Value) -> Value {
    let mut section = Section::with_capacity(1);
    section.insert(variant.to_string(), value);
    Value::Section(section)
}

pub(crate) struct SerializeVec {
    ser: ValueSerializer,
    vec: Vec<Value>,
    variant: Option<&'static str>,
}

pub(crate) struct SerializeMap {
    ser: ValueSerializer,
    map: Section,
    current_key: Option<String>,
    variant: Option<&'static str>,
}

impl ser::Serializer for ValueSerializer {
    type Ok = Option<Value>;
    type Error = Error;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVec;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeMap;

    fn serialize_bool(self, v: bool) -> Result<Option<Value>> {
        Ok(Some(Value::Bool(v)))
    }

    fn serialize_i8(self, v: i8) -> Result<Option<Value>> {
        self.int(v, IntType::Int8)
    }

    fn serialize_i16(self, v: i16) -> Result<Option<Value>> {
        self.int(v, IntType::Int16)
    }

    fn serialize_i32(self, v: i32) -> Result<Option<Value>> {
        self.int(v, IntType::Int32)
    }

    fn serialize_i64(self, v: i64) -> Result<Option<Value>> {
        self.int(v, IntType::Int64)
    }

    // 128-bit integers have no wire type of their own and take the
    // smallest one that fits.
    fn serialize_i128(self, v: i128) -> Result<Option<Value>> {
        Ok(Some(Value::Integer(Integer::compact(v)?)))
    }

    fn serialize_u8(self, v: u8) -> Result<Option<Value>> {
        self.int(v, IntType::Uint8)
    }

    fn serialize_u16(self, v: u16) -> Result<Option<Value>> {
        self.int(v, IntType::Uint16)
    }

    fn serialize_u32(self, v: u32) -> Result<Option<Value>> {
        self.int(v, IntType::Uint32)
    }

    fn serialize_u64(self, v: u64) -> Result<Option<Value>> {
        self.int(v, IntType::Uint64)
    }

    fn serialize_u128(self, v: u128) -> Result<Option<Value>> {
        let v = i128::try_from(v).map_err(|_| Error::ValueOutOfRange {
            value: i128::MAX,
            ty: IntType::Uint64.name(),
        })?;
        self.serialize_i128(v)
    }

    fn serialize_f32(self, _v: f32) -> Result<Option<Value>> {
        Err(Error::unsupported_type("double"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Option<Value>> {
        Err(Error::unsupported_type("double"))
    }

    fn serialize_char(self, v: char) -> Result<Option<Value>> {
        Ok(Some(Value::from(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> Result<Option<Value>> {
        Ok(Some(Value::from(v)))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Option<Value>> {
        Ok(Some(Value::String(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Option<Value>> {
        Ok(None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Option<Value>>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<Value>> {
        Err(Error::unsupported_type("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Option<Value>> {
        Err(Error::unsupported_type(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Option<Value>> {
        Ok(Some(Value::from(variant)))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Option<Value>>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Option<Value>>
    where
        T: ?Sized + Serialize,
    {
        Ok(Some(variant_section(variant, self.present(value)?)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec> {
        Ok(SerializeVec::new(self, len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(self, len, None))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec> {
        Ok(SerializeVec::new(self, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVec> {
        Ok(SerializeVec::new(self, len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap> {
        Ok(SerializeMap::new(self, None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeMap> {
        Ok(SerializeMap::new(self, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeMap> {
        Ok(SerializeMap::new(self, Some(variant)))
    }
}

impl SerializeVec {
    fn new(ser: ValueSerializer, len: usize, variant: Option<&'static str>) -> Self {
        SerializeVec {
            ser,
            vec: Vec::with_capacity(len.min(4096)),
            variant,
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.vec.push(self.ser.present(value)?);
        Ok(())
    }

    fn finish(self) -> Result<Option<Value>> {
        let array = Value::Array(self.vec);
        Ok(Some(match self.variant {
            Some(variant) => variant_section(variant, array),
            None => array,
        }))
    }
}

impl SerializeMap {
    fn new(ser: ValueSerializer, variant: Option<&'static str>) -> Self {
        SerializeMap {
            ser,
            map: Section::new(),
            current_key: None,
            variant,
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: String, value: &T) -> Result<()> {
        if let Some(value) = value.serialize(self.ser)? {
            self.map.insert(key, value);
        }
        Ok(())
    }

    fn finish(self) -> Result<Option<Value>> {
        let section = Value::Section(self.map);
        Ok(Some(match self.variant {
            Some(variant) => variant_section(variant, section),
            None => section,
        }))
    }
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SerializeVec {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = match self.ser.present(key)? {
            Value::String(bytes) => String::from_utf8(bytes)
                .map_err(|_| Error::custom("Section keys must be valid UTF-8"))?,
            Value::Integer(i) => i.to_string(),
            other => {
                return Err(Error::custom(format!(
                    "Section keys must be strings, found {}",
                    other.kind_name()
                )))
            }
        };
        self.current_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.field(key, value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for SerializeMap {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}
