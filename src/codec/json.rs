//! JSON codec using `serde_json`.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Serializer;
use crate::error::SerializerError;

/// JSON job body codec.
///
/// Defaults to untyped [`serde_json::Value`]; pick a concrete `T` to get
/// typed jobs back from `reserve` and `peek`.
pub struct JsonSerializer<T = serde_json::Value> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    /// Create a new JSON serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonSerializer")
    }
}

impl<T> Serializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = T;

    #[inline]
    fn serialize(&self, value: &T) -> Result<Bytes, SerializerError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::Serialize(e.to_string()))
    }

    #[inline]
    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        serde_json::from_slice(bytes).map_err(|e| SerializerError::Deserialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Task {
        id: u32,
        name: String,
    }

    #[test]
    fn test_untyped_values() {
        let codec: JsonSerializer = JsonSerializer::new();

        let bytes = codec.serialize(&json!({ "a": [1, 2] })).unwrap();
        assert_eq!(&bytes[..], br#"{"a":[1,2]}"#);

        let value = codec.deserialize(br#""plain string""#).unwrap();
        assert_eq!(value, json!("plain string"));
    }

    #[test]
    fn test_typed_values() {
        let codec = JsonSerializer::<Task>::new();
        let task = Task {
            id: 7,
            name: "resize".into(),
        };

        let bytes = codec.serialize(&task).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), task);
    }

    #[test]
    fn test_deserialize_error() {
        let codec = JsonSerializer::<Task>::new();
        let err = codec.deserialize(br#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, SerializerError::Deserialize(_)));
    }

    #[test]
    fn test_serialize_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let codec = JsonSerializer::<HashMap<(u8, u8), u8>>::new();
        let mut map = HashMap::new();
        map.insert((1, 2), 3);

        let err = codec.serialize(&map).unwrap_err();
        assert!(matches!(err, SerializerError::Serialize(_)));
    }
}
