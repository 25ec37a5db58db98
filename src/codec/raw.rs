//! Raw codec - pass-through for binary job bodies.
//!
//! Use this when payloads are already encoded by the caller. `serialize`
//! hands back the same buffer without copying.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::codec::{RawSerializer, Serializer};
//! use bytes::Bytes;
//!
//! let bytes = Bytes::from_static(b"zero copy");
//! let passed = RawSerializer.serialize(&bytes).unwrap();
//! assert_eq!(passed.as_ptr(), bytes.as_ptr()); // Same memory
//! ```

use bytes::Bytes;

use super::Serializer;
use crate::error::SerializerError;

/// Codec that passes bytes through without transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawSerializer;

impl Serializer for RawSerializer {
    type Value = Bytes;

    #[inline]
    fn serialize(&self, value: &Bytes) -> Result<Bytes, SerializerError> {
        Ok(value.clone())
    }

    #[inline]
    fn deserialize(&self, bytes: &[u8]) -> Result<Bytes, SerializerError> {
        Ok(Bytes::copy_from_slice(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_is_zero_copy() {
        let original = Bytes::from(vec![1u8, 2, 3, 4]);
        let serialized = RawSerializer.serialize(&original).unwrap();

        assert_eq!(serialized, original);
        assert_eq!(serialized.as_ptr(), original.as_ptr());
    }

    #[test]
    fn test_empty() {
        let serialized = RawSerializer.serialize(&Bytes::new()).unwrap();
        assert!(serialized.is_empty());
        assert!(RawSerializer.deserialize(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_binary_data_preserved() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        let decoded = RawSerializer.deserialize(&all_bytes).unwrap();
        assert_eq!(&decoded[..], &all_bytes[..]);
    }
}
