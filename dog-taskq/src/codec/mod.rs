pub mod json;
pub mod msgpack;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{QueueError, QueueResult};

/// Wire encoding used for a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Codec {
    /// serde_json, the default for raw payloads
    #[default]
    Json,
    /// MessagePack with named fields, used for task envelopes
    MsgPack,
}

impl Codec {
    /// Encode a value with this codec
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> QueueResult<Vec<u8>> {
        match self {
            Codec::Json => json::encode(value),
            Codec::MsgPack => msgpack::encode(value),
        }
    }

    /// Decode bytes produced by [`Codec::encode`]
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> QueueResult<T> {
        match self {
            Codec::Json => json::decode(bytes),
            Codec::MsgPack => msgpack::decode(bytes),
        }
    }

    /// Get codec identifier
    pub fn codec_id(self) -> &'static str {
        match self {
            Codec::Json => json::CODEC_ID,
            Codec::MsgPack => msgpack::CODEC_ID,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_id())
    }
}

impl FromStr for Codec {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            json::CODEC_ID => Ok(Codec::Json),
            msgpack::CODEC_ID | "rmp" => Ok(Codec::MsgPack),
            other => Err(QueueError::InvalidConfig(format!("unknown codec: {}", other))),
        }
    }
}
