use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::QueueResult;

pub const CODEC_ID: &str = "msgpack";

/// Encode as a MessagePack map keyed by field name, so decoders do not
/// depend on field order.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> QueueResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> QueueResult<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueueError;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Resize {
        width: u32,
        height: u32,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct ResizeReordered {
        height: u32,
        width: u32,
    }

    #[test]
    fn test_named_fields_survive_reordering() {
        let bytes = encode(&Resize { width: 640, height: 480 }).unwrap();

        let decoded: ResizeReordered = decode(&bytes).unwrap();
        assert_eq!(decoded, ResizeReordered { height: 480, width: 640 });
    }

    #[test]
    fn test_msgpack_decode_garbage() {
        let result = decode::<Resize>(&[0xc1]);
        assert!(matches!(result, Err(QueueError::Unmarshal(_))));
    }
}
