use portable_storage::{
    decode_stream, encode_stream, from_slice, storage, to_vec, Error, ErrorKind, Integer,
    IntType, Section, Serializer, StorageOptions, Value,
};
use std::collections::BTreeMap;

const HEADER: [u8; 9] = [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01];

fn section(value: Value) -> Section {
    match value {
        Value::Section(section) => section,
        other => panic!("Expected section, found {}", other.kind_name()),
    }
}

fn stream(body: &[u8]) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(body);
    bytes
}

fn encode_array(elements: &[Value]) -> Result<Vec<u8>, Error> {
    let mut serializer = Serializer::new(StorageOptions::new());
    serializer.write_array(elements)?;
    Ok(serializer.into_inner())
}

#[test]
fn test_single_entry_vector() {
    let root = section(storage!({ "a": 1 }));
    let bytes = encode_stream(&root).unwrap();
    assert_eq!(
        bytes,
        [0x01, 0x11, 0x01, 0x01, 0x01, 0x01, 0x02, 0x01, 0x01, 0x04, 0x01, 0x61, 0x08, 0x01]
    );
    assert_eq!(decode_stream(&bytes).unwrap(), root);
}

#[test]
fn test_uint16_array_vector() {
    let bytes = encode_array(&[Value::from(1), Value::from(300)]).unwrap();
    assert_eq!(bytes, [0x87, 0x08, 0x01, 0x00, 0x2c, 0x01]);
}

#[test]
fn test_empty_array_vector() {
    assert_eq!(encode_array(&[]).unwrap(), [0x88, 0x00]);

    let root = section(storage!({ "e": [] }));
    let bytes = encode_stream(&root).unwrap();
    assert_eq!(&bytes[9..], [0x04, 0x01, b'e', 0x88, 0x00]);
}

#[test]
fn test_boundary_widths() {
    let cases: [(i64, IntType); 9] = [
        (127, IntType::Uint8),
        (128, IntType::Uint8),
        (255, IntType::Uint8),
        (256, IntType::Uint16),
        (65535, IntType::Uint16),
        (65536, IntType::Uint32),
        (-1, IntType::Int8),
        (-128, IntType::Int16),
        (-129, IntType::Int16),
    ];

    for (n, ty) in cases {
        let mut root = Section::new();
        root.insert("v".to_string(), Value::from(n));
        let bytes = encode_stream(&root).unwrap();

        // header, count, key length, key, tag
        assert_eq!(bytes[12], ty.tag().as_u8(), "tag for {}", n);
        assert_eq!(bytes.len(), 13 + ty.width(), "length for {}", n);

        let back = decode_stream(&bytes).unwrap();
        let int = back.get("v").and_then(Value::as_integer).unwrap();
        assert_eq!(int.value(), i128::from(n));
        assert_eq!(int.pinned_type(), Some(ty));
    }
}

#[test]
fn test_auto_width_caps_at_32_bits() {
    let mut root = Section::new();
    root.insert("v".to_string(), Value::from(u64::from(u32::MAX) + 1));
    let err = encode_stream(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueOutOfRange);

    // arrays widen past the cap
    let wide = Value::from(1u64 << 40);
    assert_eq!(encode_array(&[wide.clone()]).unwrap()[0], 0x85);

    let mut root = Section::new();
    root.insert(
        "v".to_string(),
        Value::Integer(Integer::compact(1u64 << 40).unwrap()),
    );
    let back = decode_stream(&encode_stream(&root).unwrap()).unwrap();
    assert_eq!(back.get("v"), Some(&wide));

    let mut root = Section::new();
    root.insert(
        "v".to_string(),
        Value::Integer(Integer::typed(u64::MAX, IntType::Uint64).unwrap()),
    );
    let bytes = encode_stream(&root).unwrap();
    assert_eq!(&bytes[12..], [0x05, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn test_array_widening() {
    let elements = [Value::from(1), Value::from(-1), Value::from(1000)];
    let bytes = encode_array(&elements).unwrap();
    assert_eq!(bytes, [0x83, 0x0c, 0x01, 0x00, 0xff, 0xff, 0xe8, 0x03]);

    let mut root = Section::new();
    root.insert("xs".to_string(), Value::Array(elements.to_vec()));
    let back = decode_stream(&encode_stream(&root).unwrap()).unwrap();
    let xs = back.get("xs").and_then(Value::as_array).unwrap();
    let values: Vec<i64> = xs.iter().filter_map(Value::as_i64).collect();
    assert_eq!(values, [1, -1, 1000]);
    assert!(xs
        .iter()
        .all(|x| x.as_integer().and_then(Integer::pinned_type) == Some(IntType::Int16)));
}

#[test]
fn test_corrupted_signature() {
    let mut bytes = encode_stream(&section(storage!({ "a": 1 }))).unwrap();
    bytes[0] ^= 0xff;
    let err = decode_stream(&bytes).unwrap_err();
    assert!(matches!(err, Error::BadSignature { .. }));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_unsupported_version() {
    let mut bytes = stream(&[0x00]);
    bytes[8] = 0x02;
    let err = decode_stream(&bytes).unwrap_err();
    assert_eq!(err, Error::UnsupportedVersion(2));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_truncated_mid_varint() {
    // string length marker asks for four bytes, two are present
    let bytes = stream(&[0x04, 0x01, b's', 0x0a, 0x02, 0x00]);
    let err = decode_stream(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedStream);

    // root count cut short
    let err = decode_stream(&stream(&[0x01])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedStream);
}

#[test]
fn test_every_prefix_fails() {
    let root = section(storage!({
        "height": 1234567,
        "hash": "0123456789abcdef",
        "txs": ["aa", "bb"],
        "info": { "ok": true, "ids": [1, 2, 3] }
    }));
    let bytes = encode_stream(&root).unwrap();

    for len in 0..bytes.len() {
        let err = decode_stream(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TruncatedStream, "prefix {}", len);
    }
    assert_eq!(decode_stream(&bytes).unwrap(), root);
}

#[test]
fn test_key_length_limits() {
    let mut root = Section::new();
    root.insert("k".repeat(256), Value::from(1));
    assert_eq!(encode_stream(&root), Err(Error::InvalidKeyLength(256)));

    let mut root = Section::new();
    root.insert("k".repeat(255), Value::from(1));
    let bytes = encode_stream(&root).unwrap();
    assert_eq!(decode_stream(&bytes).unwrap(), root);

    let mut map = BTreeMap::new();
    map.insert("k".repeat(256), 1u8);
    assert_eq!(to_vec(&map).unwrap_err().kind(), ErrorKind::Format);
}

#[test]
fn test_double_unsupported_both_ways() {
    let mut root = Section::new();
    root.insert("d".to_string(), Value::Double(1.5));
    let err = encode_stream(&root).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);

    let err = encode_array(&[Value::Double(1.5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);

    let bytes = stream(&[0x04, 0x01, b'd', 0x09, 0, 0, 0, 0, 0, 0, 0xf8, 0x3f]);
    let err = decode_stream(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);

    #[derive(serde::Serialize)]
    struct Price {
        amount: f64,
    }
    let err = to_vec(&Price { amount: 1.5 }).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
}

#[test]
fn test_empty_array_any_base_tag() {
    let bytes = stream(&[0x04, 0x01, b'x', 0x8a, 0x00]);
    let root = decode_stream(&bytes).unwrap();
    assert_eq!(root.get("x"), Some(&Value::Array(vec![])));

    let list: BTreeMap<String, Vec<String>> = from_slice(&bytes).unwrap();
    assert!(list["x"].is_empty());

    // the base tag is not kept
    assert_eq!(
        encode_stream(&root).unwrap(),
        stream(&[0x04, 0x01, b'x', 0x88, 0x00])
    );
}

#[test]
fn test_reencode_is_byte_exact() {
    // int64 and uint32 values that auto-width would shrink
    let bytes = stream(&[
        0x08, //
        0x01, b'a', 0x01, 0x05, 0, 0, 0, 0, 0, 0, 0, //
        0x01, b'b', 0x06, 0x07, 0, 0, 0,
    ]);
    let root = decode_stream(&bytes).unwrap();
    assert_eq!(encode_stream(&root).unwrap(), bytes);
}

#[test]
fn test_string_and_section_arrays() {
    let root = section(storage!({
        "names": ["alpha", "beta"],
        "flags": [true, false],
        "peers": [{ "port": 18080 }, { "port": 28080 }]
    }));
    let bytes = encode_stream(&root).unwrap();
    assert_eq!(decode_stream(&bytes).unwrap(), root);

    // the "names" entry
    assert_eq!(
        &bytes[10..28],
        [
            0x05, b'n', b'a', b'm', b'e', b's', 0x8a, 0x08, 0x14, b'a', b'l', b'p', b'h', b'a',
            0x10, b'b', b'e', b't'
        ]
    );
}

#[test]
fn test_arrays_must_be_homogeneous() {
    let err = encode_array(&[Value::from(1), Value::from("one")]).unwrap_err();
    assert_eq!(
        err,
        Error::HeterogeneousArray {
            expected: "integer",
            found: "string"
        }
    );

    let err = encode_array(&[Value::Array(vec![])]).unwrap_err();
    assert_eq!(err, Error::NestedArray);
}
