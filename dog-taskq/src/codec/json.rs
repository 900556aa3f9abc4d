use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::QueueResult;

pub const CODEC_ID: &str = "json";

pub fn encode<T: Serialize + ?Sized>(value: &T) -> QueueResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> QueueResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueueError;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        id: u32,
        customer: String,
    }

    #[test]
    fn test_json_codec_roundtrip() {
        let invoice = Invoice {
            id: 42,
            customer: "acme".to_string(),
        };

        let bytes = encode(&invoice).unwrap();
        assert_eq!(bytes, br#"{"id":42,"customer":"acme"}"#.to_vec());

        let decoded: Invoice = decode(&bytes).unwrap();
        assert_eq!(invoice, decoded);
    }

    #[test]
    fn test_json_decode_shape_mismatch() {
        let bytes = encode(&"not an invoice").unwrap();
        let result = decode::<Invoice>(&bytes);
        assert!(matches!(result, Err(QueueError::Unmarshal(_))));
    }
}
