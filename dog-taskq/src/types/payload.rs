use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::QueueResult;

/// Encoded value handed to a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    codec: Codec,
    bytes: Bytes,
}

impl Payload {
    /// Encode a value as JSON
    pub fn new<T: Serialize + ?Sized>(value: &T) -> QueueResult<Self> {
        Self::with_codec(Codec::Json, value)
    }

    /// Encode a value with an explicit codec
    pub fn with_codec<T: Serialize + ?Sized>(codec: Codec, value: &T) -> QueueResult<Self> {
        Ok(Self {
            codec,
            bytes: Bytes::from(codec.encode(value)?),
        })
    }

    /// Wrap bytes that are already encoded
    pub fn from_bytes(codec: Codec, bytes: impl Into<Bytes>) -> Self {
        Self {
            codec,
            bytes: bytes.into(),
        }
    }

    /// Encode every value of an iterator as JSON
    pub fn batch<I, T>(values: I) -> QueueResult<Vec<Self>>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        values.into_iter().map(|value| Self::new(&value)).collect()
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode into the requested shape
    pub fn decode<T: DeserializeOwned>(&self) -> QueueResult<T> {
        self.codec.decode(&self.bytes)
    }
}
