//! MsgPack codec using `rmp-serde`.
//!
//! Structs are encoded with `to_vec_named` so they land on the wire as maps
//! keyed by field name. Producers and consumers written against other
//! MessagePack libraries then agree on the layout without sharing field order.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::codec::{MsgPackSerializer, Serializer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let codec = MsgPackSerializer::<Message>::new();
//! let msg = Message { id: 42, content: "hello".to_string() };
//! let encoded = codec.serialize(&msg).unwrap();
//! assert_eq!(codec.deserialize(&encoded).unwrap(), msg);
//! ```

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Serializer;
use crate::error::SerializerError;

/// MessagePack job body codec.
pub struct MsgPackSerializer<T = serde_json::Value> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> MsgPackSerializer<T> {
    /// Create a new MessagePack serializer.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for MsgPackSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MsgPackSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MsgPackSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MsgPackSerializer")
    }
}

impl<T> Serializer for MsgPackSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = T;

    #[inline]
    fn serialize(&self, value: &T) -> Result<Bytes, SerializerError> {
        // to_vec_named, not to_vec: structs as maps
        rmp_serde::to_vec_named(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::Serialize(e.to_string()))
    }

    #[inline]
    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        rmp_serde::from_slice(bytes).map_err(|e| SerializerError::Deserialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct TestStruct {
        id: u32,
        name: String,
        active: bool,
    }

    #[test]
    fn test_encode_decode_struct() {
        let codec = MsgPackSerializer::<TestStruct>::new();
        let original = TestStruct {
            id: 42,
            name: "test".to_string(),
            active: true,
        };

        let encoded = codec.serialize(&original).unwrap();
        assert_eq!(codec.deserialize(&encoded).unwrap(), original);
    }

    #[test]
    fn test_encode_decode_nested() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Inner {
            value: i32,
        }

        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Outer {
            inner: Inner,
            items: Vec<String>,
            retry: Option<u8>,
        }

        let codec = MsgPackSerializer::<Outer>::new();
        let original = Outer {
            inner: Inner { value: 999 },
            items: vec!["a".to_string(), "b".to_string()],
            retry: None,
        };

        let encoded = codec.serialize(&original).unwrap();
        assert_eq!(codec.deserialize(&encoded).unwrap(), original);
    }

    #[test]
    fn test_untyped_default() {
        let codec: MsgPackSerializer = MsgPackSerializer::new();
        let value = serde_json::json!({ "task": "resize", "width": 640 });

        let encoded = codec.serialize(&value).unwrap();
        assert_eq!(codec.deserialize(&encoded).unwrap(), value);
    }

    #[test]
    fn test_to_vec_named_produces_map_format() {
        let codec = MsgPackSerializer::<TestStruct>::new();
        let encoded = codec
            .serialize(&TestStruct {
                id: 1,
                name: "x".to_string(),
                active: false,
            })
            .unwrap();

        // fixmap with 3 entries is 0x83, fixarray would be 0x93
        assert_eq!(
            encoded[0] & 0xF0,
            0x80,
            "Expected map format (0x8X), got {:02X}",
            encoded[0]
        );
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let codec = MsgPackSerializer::<TestStruct>::new();
        let err = codec.deserialize(b"not valid msgpack").unwrap_err();
        assert!(matches!(err, SerializerError::Deserialize(_)));
    }
}
