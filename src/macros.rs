/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Integer literals become auto-width integers, string literals become
/// strings and `{}` blocks become sections. Any other expression is
/// converted with `Value::from`.
///
/// ```rust
/// use portable_storage::{storage, Value};
///
/// let value = storage!({ "ids": [1, 2, 3], "ok": true });
/// assert_eq!(value.get("ok"), Some(&Value::Bool(true)));
/// ```
#[macro_export]
macro_rules! storage {
    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(vec![])
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::storage!($elem)),*])
    };

    ({}) => {
        $crate::Value::Section($crate::Section::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut section = $crate::Section::new();
        $(
            section.insert($key.to_string(), $crate::storage!($value));
        )*
        $crate::Value::Section(section)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Section, Value};

    #[test]
    fn test_storage_macro_primitives() {
        assert_eq!(storage!(true), Value::Bool(true));
        assert_eq!(storage!(false), Value::Bool(false));
        assert_eq!(storage!(42), Value::from(42));
        assert_eq!(storage!("hello"), Value::String(b"hello".to_vec()));
    }

    #[test]
    fn test_storage_macro_arrays() {
        assert_eq!(storage!([]), Value::Array(vec![]));

        let arr = storage!([1, 2, 3]);
        match arr {
            Value::Array(vec) => {
                assert_eq!(vec.len(), 3);
                assert_eq!(vec[0], Value::from(1));
                assert_eq!(vec[2], Value::from(3));
            }
            _ => panic!("Expected array"),
        }
    }

    #[test]
    fn test_storage_macro_sections() {
        assert_eq!(storage!({}), Value::Section(Section::new()));

        let section = storage!({
            "name": "node",
            "port": 18080
        });

        match section {
            Value::Section(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get("name"), Some(&Value::from("node")));
                assert_eq!(map.get("port"), Some(&Value::from(18080)));
            }
            _ => panic!("Expected section"),
        }
    }
}
