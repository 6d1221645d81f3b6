use portable_storage::{encode_stream, storage, Integer, IntType, Section, Value};

#[test]
fn test_storage_macro_booleans() {
    assert_eq!(storage!(true), Value::Bool(true));
    assert_eq!(storage!(false), Value::Bool(false));
}

#[test]
fn test_storage_macro_numbers() {
    let int_val = storage!(42);
    assert_eq!(int_val, Value::Integer(Integer::auto(42)));

    let negative_val = storage!(-123);
    assert_eq!(negative_val, Value::from(-123));

    let pinned = storage!(Integer::typed(7u8, IntType::Uint64).unwrap());
    assert_eq!(
        pinned.as_integer().and_then(Integer::pinned_type),
        Some(IntType::Uint64)
    );
}

#[test]
fn test_storage_macro_strings() {
    assert_eq!(storage!("hello world"), Value::String(b"hello world".to_vec()));
    assert_eq!(storage!(""), Value::String(Vec::new()));
    assert_eq!(storage!(vec![0u8, 255]), Value::String(vec![0, 255]));
}

#[test]
fn test_storage_macro_arrays() {
    assert_eq!(storage!([]), Value::Array(vec![]));

    assert_eq!(
        storage!([1, 2, 3]),
        Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)])
    );

    let strings = storage!(["a", "b",]);
    assert_eq!(strings.as_array().map(Vec::len), Some(2));
}

#[test]
fn test_storage_macro_sections() {
    assert_eq!(storage!({}), Value::Section(Section::new()));

    let value = storage!({
        "status": "OK",
        "count": 2,
        "ok": true,
    });
    assert_eq!(value.get("status").and_then(Value::as_str), Some("OK"));
    assert_eq!(value.get("count").and_then(Value::as_i64), Some(2));
    assert_eq!(value.get("ok").and_then(Value::as_bool), Some(true));
}

#[test]
fn test_storage_macro_nested() {
    let value = storage!({
        "blocks": [
            { "height": 1, "hash": "aa" },
            { "height": 2, "hash": "bb" }
        ],
        "info": {
            "peers": ["10.0.0.1", "10.0.0.2"],
            "synced": false
        }
    });

    let blocks = value.get("blocks").and_then(Value::as_array).unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].get("hash").and_then(Value::as_str), Some("bb"));

    let peers = value
        .get("info")
        .and_then(|info| info.get("peers"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(peers[0], Value::from("10.0.0.1"));

    let root = match value {
        Value::Section(section) => section,
        _ => panic!("Expected section"),
    };
    assert!(encode_stream(&root).is_ok());
}
