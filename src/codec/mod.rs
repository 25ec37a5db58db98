//! Codec module - pluggable job payload serialization.
//!
//! Job bodies on `put`, `reserve` and the `peek` family go through a
//! [`Serializer`]. Structured bodies (stats, tube lists) never do; they are
//! always YAML.
//!
//! - [`JsonSerializer`] - JSON text via `serde_json` (default)
//! - [`MsgPackSerializer`] - MessagePack via `rmp-serde`
//! - [`RawSerializer`] - pass-through for raw bytes
//!
//! # Example
//!
//! ```
//! use beanstalk_client::codec::{JsonSerializer, Serializer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Email {
//!     to: String,
//! }
//!
//! let codec = JsonSerializer::<Email>::new();
//! let bytes = codec.serialize(&Email { to: "a@b.c".into() }).unwrap();
//! assert_eq!(&bytes[..], br#"{"to":"a@b.c"}"#);
//! assert_eq!(codec.deserialize(&bytes).unwrap().to, "a@b.c");
//! ```

mod json;
mod msgpack;
mod raw;

use bytes::Bytes;

use crate::error::SerializerError;

pub use json::JsonSerializer;
pub use msgpack::MsgPackSerializer;
pub use raw::RawSerializer;

/// Encodes caller values into job bodies and back.
pub trait Serializer: Send + Sync + 'static {
    /// Value type the caller works with.
    type Value: Send + 'static;

    /// Encode a value into job body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Serialize`] if the value cannot be encoded.
    fn serialize(&self, value: &Self::Value) -> Result<Bytes, SerializerError>;

    /// Decode job body bytes into a value.
    ///
    /// # Errors
    ///
    /// Returns [`SerializerError::Deserialize`] if the bytes are not a valid
    /// encoding of `Value`.
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Value, SerializerError>;
}
